//! Candidate pool assembly: a deduplicated id universe wide enough to
//! contain the true top-N by any tracked signal, without a full table scan.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::igdb::client::GAME_FIELDS;
use crate::igdb::query::{base_content_filter, GameQuery};
use crate::igdb::records::RawGameRecord;
use crate::igdb::Catalog;
use crate::transform::{transform, CanonicalGameRecord};

/// Identifier batch bound for detail hydration requests.
pub const DETAIL_BATCH_SIZE: usize = 200;
/// Hype-sorted fallback window unioned into every pool.
pub const FALLBACK_POOL_LIMIT: usize = 400;

/// A game eligible for ranking: the canonical record plus the raw fields
/// the scoring engine needs.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: CanonicalGameRecord,
    pub hype: f64,
    pub follows: f64,
    pub rating: Option<f64>,
    pub released_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Candidate {
    pub fn from_raw(raw: &RawGameRecord) -> Self {
        Self {
            record: transform(raw),
            hype: raw.hypes.unwrap_or(0) as f64,
            follows: raw.follows.unwrap_or(0) as f64,
            rating: raw.total_rating,
            released_at: raw.first_release_date,
            updated_at: raw.updated_at,
        }
    }

    pub fn id(&self) -> i64 {
        self.record.id
    }
}

/// Deduplicated candidates in insertion order (the documented tie-break
/// order), plus the per-type signal windows they were drawn from.
#[derive(Debug, Default)]
pub struct CandidatePool {
    pub candidates: Vec<Candidate>,
    /// Tracked type id -> (game id -> raw value) within the fetched top-K.
    pub per_type_values: HashMap<i64, HashMap<i64, f64>>,
    /// Tracked type id -> max value observed in its top-K, floored at 1.
    pub per_type_max: HashMap<i64, f64>,
    /// Selection-ordered tracked type ids.
    pub tracked_type_ids: Vec<i64>,
    /// True when signal data was unavailable and only the fallback pool
    /// (hype+follows scoring) applies.
    pub degraded: bool,
}

/// Case-insensitive substring match of a popularity-type name against the
/// configured keyword set.
pub fn is_tracked_type(name: &str, keywords: &[String]) -> bool {
    let lowered = name.to_ascii_lowercase();
    keywords
        .iter()
        .any(|kw| !kw.is_empty() && lowered.contains(&kw.to_ascii_lowercase()))
}

pub struct CandidatePoolBuilder<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    cfg: &'a SyncConfig,
}

struct SignalWindows {
    tracked_type_ids: Vec<i64>,
    per_type_values: HashMap<i64, HashMap<i64, f64>>,
    per_type_max: HashMap<i64, f64>,
    /// Candidate ids in first-seen order across the per-type windows.
    ordered_ids: Vec<i64>,
}

impl<'a, C: Catalog + ?Sized> CandidatePoolBuilder<'a, C> {
    pub fn new(catalog: &'a C, cfg: &'a SyncConfig) -> Self {
        Self { catalog, cfg }
    }

    pub async fn build(&self) -> Result<CandidatePool> {
        let fallback = self.fetch_fallback_pool().await?;

        let windows = match self.fetch_signal_windows().await {
            Ok(Some(windows)) => windows,
            Ok(None) => {
                warn!(
                    target = "homepage",
                    "no popularity types matched the keyword set; using degraded pool"
                );
                return Ok(Self::degraded_pool(fallback));
            }
            Err(err) => {
                warn!(
                    target = "homepage",
                    error = %err,
                    "popularity type fetch failed; using degraded pool"
                );
                return Ok(Self::degraded_pool(fallback));
            }
        };

        // Union: signal-window ids first (first-seen order), then the
        // hype-sorted fallback. This order is the scoring tie-break.
        let mut ordered_ids = windows.ordered_ids;
        let mut seen: HashSet<i64> = ordered_ids.iter().copied().collect();
        for raw in &fallback {
            if seen.insert(raw.id) {
                ordered_ids.push(raw.id);
            }
        }

        let details = self.hydrate_details(&ordered_ids).await;
        let candidates: Vec<Candidate> = ordered_ids
            .iter()
            .filter_map(|id| details.get(id))
            .map(Candidate::from_raw)
            .collect();

        info!(
            target = "homepage",
            tracked_types = windows.tracked_type_ids.len(),
            pool_size = candidates.len(),
            "candidate pool assembled"
        );

        Ok(CandidatePool {
            candidates,
            per_type_values: windows.per_type_values,
            per_type_max: windows.per_type_max,
            tracked_type_ids: windows.tracked_type_ids,
            degraded: false,
        })
    }

    /// Steps 1-2: select tracked types and fetch their top-K windows.
    /// Ok(None) means no usable signal data (degraded pool applies).
    async fn fetch_signal_windows(&self) -> Result<Option<SignalWindows>> {
        let types = self.catalog.popularity_types().await?;
        let tracked: Vec<_> = types
            .into_iter()
            .filter(|t| {
                t.name
                    .as_deref()
                    .map(|name| is_tracked_type(name, &self.cfg.popularity_keywords))
                    .unwrap_or(false)
            })
            .collect();
        if tracked.is_empty() {
            return Ok(None);
        }

        let mut per_type_values: HashMap<i64, HashMap<i64, f64>> = HashMap::new();
        let mut per_type_max: HashMap<i64, f64> = HashMap::new();
        let mut tracked_type_ids: Vec<i64> = Vec::new();
        let mut ordered_ids: Vec<i64> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        for ptype in &tracked {
            let primitives = match self
                .catalog
                .popularity_primitives(ptype.id, self.cfg.primitive_limit)
                .await
            {
                Ok(rows) => rows,
                Err(err) => {
                    // Soft failure: this type contributes nothing this run.
                    warn!(
                        target = "homepage",
                        type_id = ptype.id,
                        type_name = ptype.name.as_deref().unwrap_or(""),
                        error = %err,
                        "primitive fetch failed; skipping type"
                    );
                    continue;
                }
            };
            let mut values: HashMap<i64, f64> = HashMap::with_capacity(primitives.len());
            let mut max_value = 1.0f64;
            for row in &primitives {
                values.insert(row.game_id, row.value);
                if row.value > max_value {
                    max_value = row.value;
                }
                if seen.insert(row.game_id) {
                    ordered_ids.push(row.game_id);
                }
            }
            per_type_values.insert(ptype.id, values);
            per_type_max.insert(ptype.id, max_value);
            tracked_type_ids.push(ptype.id);
        }

        if tracked_type_ids.is_empty() {
            // Every per-type fetch failed; no signal data survived.
            return Ok(None);
        }
        Ok(Some(SignalWindows {
            tracked_type_ids,
            per_type_values,
            per_type_max,
            ordered_ids,
        }))
    }

    /// Hype-sorted fallback window: widens coverage and guarantees a
    /// non-empty pool when signal data is sparse. A failure here is fatal;
    /// the run cannot proceed without its primary candidate fetch.
    async fn fetch_fallback_pool(&self) -> Result<Vec<RawGameRecord>> {
        let query = GameQuery::new()
            .fields(GAME_FIELDS)
            .filter(base_content_filter())
            .sort_desc("hypes")
            .limit(FALLBACK_POOL_LIMIT);
        self.catalog.list_games(&query).await
    }

    /// Step 5: full details for every candidate id, in bounded batches.
    /// A failed batch is logged and dropped; the run continues.
    async fn hydrate_details(&self, ids: &[i64]) -> HashMap<i64, RawGameRecord> {
        let mut details: HashMap<i64, RawGameRecord> = HashMap::with_capacity(ids.len());
        for batch in ids.chunks(DETAIL_BATCH_SIZE) {
            match self.catalog.games_by_ids(batch).await {
                Ok(records) => {
                    for record in records {
                        details.insert(record.id, record);
                    }
                }
                Err(err) => {
                    warn!(
                        target = "homepage",
                        batch_len = batch.len(),
                        error = %err,
                        "candidate detail batch failed; dropping batch"
                    );
                }
            }
        }
        details
    }

    fn degraded_pool(fallback: Vec<RawGameRecord>) -> CandidatePool {
        let mut seen: HashSet<i64> = HashSet::new();
        let candidates = fallback
            .iter()
            .filter(|raw| seen.insert(raw.id))
            .map(Candidate::from_raw)
            .collect();
        CandidatePool {
            candidates,
            degraded: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_POPULARITY_KEYWORDS;

    fn keywords() -> Vec<String> {
        DEFAULT_POPULARITY_KEYWORDS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let kws = keywords();
        assert!(is_tracked_type("24hr Peak Players", &kws));
        assert!(is_tracked_type("Want to Play", &kws));
        assert!(is_tracked_type("IGDB Page Visits", &kws));
        assert!(is_tracked_type("Positive Reviews", &kws));
        assert!(!is_tracked_type("Global Sales", &kws));
    }

    #[test]
    fn empty_keyword_never_matches() {
        assert!(!is_tracked_type("anything", &[String::new()]));
    }

    #[test]
    fn candidate_from_raw_defaults_missing_counters_to_zero() {
        let raw = RawGameRecord {
            id: 9,
            ..Default::default()
        };
        let c = Candidate::from_raw(&raw);
        assert_eq!(c.hype, 0.0);
        assert_eq!(c.follows, 0.0);
        assert!(c.rating.is_none());
    }

    #[test]
    fn degraded_pool_dedupes_and_flags() {
        let fallback = vec![
            RawGameRecord {
                id: 1,
                hypes: Some(10),
                ..Default::default()
            },
            RawGameRecord {
                id: 2,
                hypes: Some(5),
                ..Default::default()
            },
            RawGameRecord {
                id: 1,
                hypes: Some(10),
                ..Default::default()
            },
        ];
        let pool = CandidatePoolBuilder::<crate::igdb::client::IgdbClient>::degraded_pool(fallback);
        assert!(pool.degraded);
        let ids: Vec<i64> = pool.candidates.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
