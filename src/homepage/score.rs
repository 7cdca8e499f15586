//! Weighted multi-criteria scoring. Deterministic given identical inputs and
//! pool contents; ties resolve by candidate-pool insertion order (a stable
//! sort over the pool vector), which is the documented tie-break policy.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::transform::CanonicalGameRecord;

use super::normalize::{normalize, pool_maxima};
use super::pool::{Candidate, CandidatePool};

/// Weight split across however many popularity types were selected.
pub const PRIMITIVE_WEIGHT_TOTAL: f64 = 0.60;
pub const HYPE_WEIGHT: f64 = 0.15;
pub const FOLLOWS_WEIGHT: f64 = 0.10;
pub const RATING_WEIGHT: f64 = 0.15;

pub const RECENT_RELEASE_DAYS: i64 = 180;
pub const RECENT_RELEASE_BONUS: f64 = 0.25;
pub const STALE_RELEASE_DAYS: i64 = 1095;
pub const STALE_RELEASE_PENALTY: f64 = 0.25;
pub const RECENT_UPDATE_DAYS: i64 = 45;
pub const RECENT_UPDATE_BONUS: f64 = 0.15;

const SECONDS_PER_DAY: i64 = 86_400;

/// Flat bonuses/penalties keyed to release/update age. Missing timestamps
/// contribute nothing, not a penalty. Future release dates count as not yet
/// released: no bonus, no penalty.
pub fn recency_adjustment(
    released_at: Option<i64>,
    updated_at: Option<i64>,
    now: DateTime<Utc>,
) -> f64 {
    let mut adjustment = 0.0;
    if let Some(released) = released_at {
        let age_days = (now.timestamp() - released) / SECONDS_PER_DAY;
        if (0..=RECENT_RELEASE_DAYS).contains(&age_days) {
            adjustment += RECENT_RELEASE_BONUS;
        } else if age_days > STALE_RELEASE_DAYS {
            adjustment -= STALE_RELEASE_PENALTY;
        }
    }
    if let Some(updated) = updated_at {
        let age_days = (now.timestamp() - updated) / SECONDS_PER_DAY;
        if age_days <= RECENT_UPDATE_DAYS {
            adjustment += RECENT_UPDATE_BONUS;
        }
    }
    adjustment
}

/// One score per candidate, in pool order.
pub fn score_pool(pool: &CandidatePool, now: DateTime<Utc>) -> Vec<f64> {
    if pool.degraded {
        // Degraded path: unweighted hype+follows, no normalization, no recency.
        return pool
            .candidates
            .iter()
            .map(|c| c.hype + c.follows)
            .collect();
    }

    let maxima = pool_maxima(&pool.candidates);
    let type_count = pool.tracked_type_ids.len();
    let per_type_weight = if type_count > 0 {
        PRIMITIVE_WEIGHT_TOTAL / type_count as f64
    } else {
        0.0
    };

    pool.candidates
        .iter()
        .map(|c| multi_signal_score(pool, c, per_type_weight, &maxima, now))
        .collect()
}

fn multi_signal_score(
    pool: &CandidatePool,
    candidate: &Candidate,
    per_type_weight: f64,
    maxima: &super::normalize::FieldMaxima,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = 0.0;
    for type_id in &pool.tracked_type_ids {
        // Absent from a type's top-K window means value 0, not exclusion.
        let value = pool
            .per_type_values
            .get(type_id)
            .and_then(|m| m.get(&candidate.id()))
            .copied()
            .unwrap_or(0.0);
        let max = pool.per_type_max.get(type_id).copied().unwrap_or(1.0);
        score += per_type_weight * normalize(value, max);
    }
    score += HYPE_WEIGHT * normalize(candidate.hype, maxima.hype);
    score += FOLLOWS_WEIGHT * normalize(candidate.follows, maxima.follows);
    score += RATING_WEIGHT * normalize(candidate.rating.unwrap_or(0.0), maxima.rating);
    score + recency_adjustment(candidate.released_at, candidate.updated_at, now)
}

/// Score, sort descending (stable; insertion order breaks ties), dedupe by
/// game id, take the first `count`.
pub fn rank_popular(
    pool: &CandidatePool,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<CanonicalGameRecord> {
    let scores = score_pool(pool, now);
    let mut indexed: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen: HashSet<i64> = HashSet::new();
    let mut out: Vec<CanonicalGameRecord> = Vec::with_capacity(count.min(indexed.len()));
    for (idx, _score) in indexed {
        if out.len() >= count {
            break;
        }
        let candidate = &pool.candidates[idx];
        if !seen.insert(candidate.id()) {
            continue;
        }
        out.push(candidate.record.clone());
    }
    out
}
