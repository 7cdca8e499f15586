//! Orchestrates one sync run: featured window, ranked popular section,
//! per-genre windows, then a single wholesale document replace.

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::config::SyncConfig;
use crate::firestore::DocumentStore;
use crate::igdb::Catalog;

use super::document::{HomepageDocument, HOMEPAGE_COLLECTION, HOMEPAGE_DOC_KEY};
use super::pool::CandidatePoolBuilder;
use super::sampler::SectionSampler;
use super::score::rank_popular;

pub struct HomepageAssembler<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    cfg: &'a SyncConfig,
}

impl<'a, C: Catalog + ?Sized> HomepageAssembler<'a, C> {
    pub fn new(catalog: &'a C, cfg: &'a SyncConfig) -> Self {
        Self { catalog, cfg }
    }

    /// Build the full document without touching the destination store.
    pub async fn assemble(&self) -> Result<HomepageDocument> {
        let sampler = SectionSampler::new(self.catalog);
        let mut doc = HomepageDocument::empty(&self.cfg.genre_names);

        doc.featured = sampler.featured(self.cfg.featured_count).await?;
        info!(
            target = "homepage",
            featured = doc.featured.len(),
            "featured section sampled"
        );

        let pool = CandidatePoolBuilder::new(self.catalog, self.cfg)
            .build()
            .await?;
        doc.popular = rank_popular(&pool, Utc::now(), self.cfg.popular_count);
        info!(
            target = "homepage",
            pool = pool.candidates.len(),
            degraded = pool.degraded,
            popular = doc.popular.len(),
            "popular section ranked"
        );

        for name in &self.cfg.genre_names {
            let section = sampler.genre_section(name, self.cfg.genre_count).await?;
            info!(
                target = "homepage",
                genre = name.as_str(),
                games = section.len(),
                "genre section sampled"
            );
            doc.genres.insert(name.clone(), section);
        }

        Ok(doc)
    }

    /// Assemble and replace the single "current" homepage document. Any
    /// fatal assembly error aborts before the write; no partial document is
    /// ever persisted.
    pub async fn run<S: DocumentStore + ?Sized>(&self, store: &S) -> Result<HomepageDocument> {
        let doc = self.assemble().await?;
        let payload = serde_json::to_value(&doc)?;
        store
            .replace(HOMEPAGE_COLLECTION, HOMEPAGE_DOC_KEY, &payload)
            .await?;
        info!(
            target = "homepage",
            featured = doc.featured.len(),
            popular = doc.popular.len(),
            genres = doc.genres.len(),
            "homepage document published"
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::*;
    use crate::igdb::query::GameQuery;
    use crate::igdb::records::{PopularityPrimitive, PopularityType, RawGameRecord};

    #[derive(Default)]
    struct FakeCatalog {
        base_games: Vec<RawGameRecord>,
        genre_games: Vec<RawGameRecord>,
        types: Vec<PopularityType>,
        fail_types: bool,
        fail_details: bool,
        failing_primitive_types: HashSet<i64>,
        fail_genre_lookup: bool,
        primitives: HashMap<i64, Vec<PopularityPrimitive>>,
        genre_ids: HashMap<String, i64>,
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn count_games(&self, where_clause: &str) -> Result<u64> {
            if where_clause.contains("genres = (") {
                Ok(self.genre_games.len() as u64)
            } else {
                Ok(self.base_games.len() as u64)
            }
        }

        async fn list_games(&self, query: &GameQuery) -> Result<Vec<RawGameRecord>> {
            if query.where_clause().contains("genres = (") {
                Ok(self.genre_games.clone())
            } else {
                Ok(self.base_games.clone())
            }
        }

        async fn games_by_ids(&self, ids: &[i64]) -> Result<Vec<RawGameRecord>> {
            if self.fail_details {
                return Err(anyhow!("detail endpoint down"));
            }
            Ok(self
                .base_games
                .iter()
                .filter(|g| ids.contains(&g.id))
                .cloned()
                .collect())
        }

        async fn popularity_types(&self) -> Result<Vec<PopularityType>> {
            if self.fail_types {
                return Err(anyhow!("types endpoint down"));
            }
            Ok(self.types.clone())
        }

        async fn popularity_primitives(
            &self,
            type_id: i64,
            _limit: usize,
        ) -> Result<Vec<PopularityPrimitive>> {
            if self.failing_primitive_types.contains(&type_id) {
                return Err(anyhow!("primitive endpoint down for type {type_id}"));
            }
            Ok(self.primitives.get(&type_id).cloned().unwrap_or_default())
        }

        async fn genre_id_by_name(&self, name: &str) -> Result<Option<i64>> {
            if self.fail_genre_lookup {
                return Err(anyhow!("genre endpoint down"));
            }
            Ok(self.genre_ids.get(name).copied())
        }
    }

    #[derive(Default)]
    struct MemStore {
        docs: Mutex<HashMap<(String, String), Value>>,
    }

    #[async_trait]
    impl DocumentStore for MemStore {
        async fn replace(&self, collection: &str, key: &str, payload: &Value) -> Result<()> {
            self.docs
                .lock()
                .await
                .insert((collection.to_string(), key.to_string()), payload.clone());
            Ok(())
        }

        async fn set_many(&self, collection: &str, docs: &[(String, Value)]) -> Result<()> {
            let mut guard = self.docs.lock().await;
            for (key, payload) in docs {
                guard.insert((collection.to_string(), key.clone()), payload.clone());
            }
            Ok(())
        }
    }

    fn game(id: i64, hypes: i64) -> RawGameRecord {
        RawGameRecord {
            id,
            name: Some(format!("Game {id}")),
            hypes: Some(hypes),
            ..Default::default()
        }
    }

    fn test_cfg() -> SyncConfig {
        SyncConfig {
            genre_names: vec!["Shooter".into(), "Adventure".into()],
            popular_count: 3,
            featured_count: 2,
            genre_count: 2,
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn empty_universe_yields_empty_sections_with_all_genre_keys() {
        let catalog = FakeCatalog::default();
        let cfg = test_cfg();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .assemble()
            .await
            .unwrap();
        assert!(doc.featured.is_empty());
        assert!(doc.popular.is_empty());
        let keys: Vec<&String> = doc.genres.keys().collect();
        assert_eq!(keys, vec!["Shooter", "Adventure"]);
        assert!(doc.genres.values().all(|v| v.is_empty()));
    }

    #[tokio::test]
    async fn genre_resolution_miss_keeps_other_sections_alive() {
        let catalog = FakeCatalog {
            base_games: vec![game(1, 100), game(2, 50), game(3, 10)],
            genre_games: vec![game(4, 5)],
            genre_ids: HashMap::from([("Shooter".to_string(), 5)]),
            ..Default::default()
        };
        let cfg = test_cfg();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .assemble()
            .await
            .unwrap();
        assert!(!doc.featured.is_empty());
        assert!(!doc.popular.is_empty());
        assert!(!doc.genres["Shooter"].is_empty());
        // "Adventure" has no provider id: present but empty.
        assert!(doc.genres["Adventure"].is_empty());
    }

    #[tokio::test]
    async fn popular_section_respects_count_and_uniqueness() {
        let catalog = FakeCatalog {
            base_games: (1..=10).map(|id| game(id, 100 - id)).collect(),
            types: vec![PopularityType {
                id: 1,
                name: Some("24hr Peak Players".into()),
            }],
            primitives: HashMap::from([(
                1,
                vec![
                    PopularityPrimitive {
                        game_id: 3,
                        value: 900.0,
                        popularity_type: 1,
                    },
                    PopularityPrimitive {
                        game_id: 7,
                        value: 400.0,
                        popularity_type: 1,
                    },
                ],
            )]),
            ..Default::default()
        };
        let cfg = test_cfg();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .assemble()
            .await
            .unwrap();
        assert!(doc.popular.len() <= cfg.popular_count);
        let mut ids: Vec<i64> = doc.popular.iter().map(|r| r.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before, "popular section must not repeat games");
        // The strongest primitive signal should lead the ranking.
        assert_eq!(doc.popular[0].id, 3);
    }

    #[tokio::test]
    async fn failed_detail_batches_drop_candidates_but_the_run_continues() {
        let catalog = FakeCatalog {
            base_games: vec![game(1, 100), game(2, 50)],
            types: vec![PopularityType {
                id: 1,
                name: Some("24hr Peak Players".into()),
            }],
            primitives: HashMap::from([(
                1,
                vec![PopularityPrimitive {
                    game_id: 1,
                    value: 900.0,
                    popularity_type: 1,
                }],
            )]),
            fail_details: true,
            ..Default::default()
        };
        let cfg = test_cfg();
        let store = MemStore::default();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .run(&store)
            .await
            .unwrap();
        // Every hydration batch failed, so the ranked section is empty, but
        // the featured window and the publish itself still go through.
        assert!(doc.popular.is_empty());
        assert!(!doc.featured.is_empty());
        assert!(store
            .docs
            .lock()
            .await
            .contains_key(&("homepage".to_string(), "current".to_string())));
    }

    #[tokio::test]
    async fn one_failing_primitive_type_is_skipped_without_degrading() {
        let catalog = FakeCatalog {
            base_games: (1..=6).map(|id| game(id, 100 - id)).collect(),
            types: vec![
                PopularityType {
                    id: 1,
                    name: Some("24hr Peak Players".into()),
                },
                PopularityType {
                    id: 2,
                    name: Some("Want to Play".into()),
                },
            ],
            failing_primitive_types: HashSet::from([1]),
            primitives: HashMap::from([(
                2,
                vec![PopularityPrimitive {
                    game_id: 5,
                    value: 700.0,
                    popularity_type: 2,
                }],
            )]),
            ..Default::default()
        };
        let cfg = test_cfg();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .assemble()
            .await
            .unwrap();
        // Weighted scoring still applies: the surviving type's top game wins
        // despite id 1 having the most hype. Degraded (hype-only) scoring
        // would have put id 1 first.
        assert_eq!(doc.popular[0].id, 5);
    }

    #[tokio::test]
    async fn all_primitive_fetches_failing_falls_back_to_hype_order() {
        let catalog = FakeCatalog {
            base_games: vec![game(1, 10), game(2, 90)],
            types: vec![PopularityType {
                id: 1,
                name: Some("24hr Peak Players".into()),
            }],
            failing_primitive_types: HashSet::from([1]),
            ..Default::default()
        };
        let cfg = test_cfg();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .assemble()
            .await
            .unwrap();
        assert_eq!(doc.popular[0].id, 2);
    }

    #[tokio::test]
    async fn genre_lookup_errors_leave_empty_sections_without_aborting() {
        let catalog = FakeCatalog {
            base_games: vec![game(1, 100), game(2, 50)],
            fail_genre_lookup: true,
            ..Default::default()
        };
        let cfg = test_cfg();
        let store = MemStore::default();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .run(&store)
            .await
            .unwrap();
        assert!(!doc.featured.is_empty());
        assert!(!doc.popular.is_empty());
        assert!(doc.genres.values().all(|v| v.is_empty()));
        assert_eq!(doc.genres.len(), cfg.genre_names.len());
    }

    #[tokio::test]
    async fn type_fetch_failure_degrades_but_still_publishes() {
        let catalog = FakeCatalog {
            base_games: vec![game(1, 10), game(2, 90)],
            fail_types: true,
            ..Default::default()
        };
        let cfg = test_cfg();
        let store = MemStore::default();
        let doc = HomepageAssembler::new(&catalog, &cfg)
            .run(&store)
            .await
            .unwrap();
        // Degraded scoring: raw hype+follows, so id 2 wins.
        assert_eq!(doc.popular[0].id, 2);
        let written = store.docs.lock().await;
        let payload = written
            .get(&("homepage".to_string(), "current".to_string()))
            .expect("one current document");
        assert!(payload.get("createdAt").is_some());
        assert!(payload.get("genres").is_some());
    }
}
