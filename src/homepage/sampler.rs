//! Windowed random sampling for the non-ranked sections. One count query,
//! one random offset, one page fetch; the result is a contiguous slice that
//! varies per run, an accepted approximation of a uniform sample since the
//! provider cannot sample natively.

use anyhow::Result;
use rand::Rng;
use tracing::{info, warn};

use crate::igdb::client::GAME_FIELDS;
use crate::igdb::query::{base_content_filter, genre_content_filter, GameQuery};
use crate::igdb::Catalog;
use crate::transform::{transform, CanonicalGameRecord};

/// Uniform offset in [0, max(0, total - window)]. Totals at or below the
/// window size force offset 0.
pub fn window_offset(total: u64, window: usize, rng: &mut impl Rng) -> usize {
    let max_offset = total.saturating_sub(window as u64);
    if max_offset == 0 {
        0
    } else {
        rng.gen_range(0..=max_offset) as usize
    }
}

pub struct SectionSampler<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> SectionSampler<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// One random window of `window` records matching the filter, in the
    /// provider's default order. Zero matches yield an empty list.
    pub async fn sample_window(
        &self,
        filter: &str,
        window: usize,
    ) -> Result<Vec<CanonicalGameRecord>> {
        let total = self.catalog.count_games(filter).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        let offset = window_offset(total, window, &mut rand::thread_rng());
        info!(
            target = "homepage",
            total, offset, window, "sampling section window"
        );
        let query = GameQuery::new()
            .fields(GAME_FIELDS)
            .filter(filter)
            .limit(window)
            .offset(offset);
        let raws = self.catalog.list_games(&query).await?;
        Ok(raws.iter().map(transform).collect())
    }

    pub async fn featured(&self, window: usize) -> Result<Vec<CanonicalGameRecord>> {
        self.sample_window(&base_content_filter(), window).await
    }

    /// Genre sections resolve the display name to a provider id first. A
    /// resolution miss (or lookup failure) is soft: warn and return empty.
    pub async fn genre_section(
        &self,
        genre_name: &str,
        window: usize,
    ) -> Result<Vec<CanonicalGameRecord>> {
        let genre_id = match self.catalog.genre_id_by_name(genre_name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(
                    target = "homepage",
                    genre = genre_name,
                    "genre name did not resolve to a provider id; section will be empty"
                );
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(
                    target = "homepage",
                    genre = genre_name,
                    error = %err,
                    "genre lookup failed; section will be empty"
                );
                return Ok(Vec::new());
            }
        };
        self.sample_window(&genre_content_filter(genre_id), window)
            .await
    }
}
