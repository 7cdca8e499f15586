use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::transform::CanonicalGameRecord;

/// Destination collection and the single "current" document key. The
/// document is replaced wholesale on every run, never appended.
pub const HOMEPAGE_COLLECTION: &str = "homepage";
pub const HOMEPAGE_DOC_KEY: &str = "current";

/// The assembled homepage. `genres` is an IndexMap so the configured
/// genre-name set and order survive serialization exactly, empty sections
/// included.
#[derive(Debug, Serialize)]
pub struct HomepageDocument {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub featured: Vec<CanonicalGameRecord>,
    pub popular: Vec<CanonicalGameRecord>,
    pub genres: IndexMap<String, Vec<CanonicalGameRecord>>,
}

impl HomepageDocument {
    /// Empty document carrying every configured genre key in order.
    pub fn empty(genre_names: &[String]) -> Self {
        let mut genres = IndexMap::with_capacity(genre_names.len());
        for name in genre_names {
            genres.insert(name.clone(), Vec::new());
        }
        Self {
            created_at: Utc::now(),
            featured: Vec::new(),
            popular: Vec::new(),
            genres,
        }
    }
}
