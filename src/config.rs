use std::time::Duration;

use anyhow::Result;

use crate::util::env::{env_list, env_parse, env_req, preflight_check};

/// Popularity-type names are matched against these substrings (case-insensitive).
/// Provider vocabulary drifts, so the set is overridable via env.
pub const DEFAULT_POPULARITY_KEYWORDS: &[&str] = &[
    "peak", "player", "page", "view", "want", "positive", "reviews",
];

pub const DEFAULT_GENRES: &[&str] = &[
    "Adventure",
    "Shooter",
    "Role-playing (RPG)",
    "Platform",
    "Indie",
];

/// Full configuration surface for one sync run. Missing required keys are a
/// fatal startup condition surfaced before any network call.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub igdb_client_id: String,
    pub igdb_access_token: String,
    pub firestore_project_id: String,
    pub firestore_credentials_json: String,
    /// Top-K window fetched per tracked popularity type.
    pub primitive_limit: usize,
    pub featured_count: usize,
    pub popular_count: usize,
    pub genre_count: usize,
    /// Genre display names, in homepage order.
    pub genre_names: Vec<String>,
    /// Self-imposed rate limit: slept after every external call.
    pub request_delay: Duration,
    pub popularity_keywords: Vec<String>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        preflight_check(
            "homepage_sync",
            &[
                "IGDB_CLIENT_ID",
                "IGDB_ACCESS_TOKEN",
                "FIRESTORE_PROJECT_ID",
                "FIREBASE_CREDENTIALS_JSON",
            ],
            &[
                "IGDB_CLIENT_ID",
                "FIRESTORE_PROJECT_ID",
                "HOMEPAGE_GENRES",
                "HOMEPAGE_PRIMITIVE_LIMIT",
                "HOMEPAGE_REQUEST_DELAY_MS",
            ],
        )?;

        Ok(Self {
            igdb_client_id: env_req("IGDB_CLIENT_ID")?,
            igdb_access_token: env_req("IGDB_ACCESS_TOKEN")?,
            firestore_project_id: env_req("FIRESTORE_PROJECT_ID")?,
            firestore_credentials_json: env_req("FIREBASE_CREDENTIALS_JSON")?,
            primitive_limit: env_parse("HOMEPAGE_PRIMITIVE_LIMIT", 100usize).max(1),
            featured_count: env_parse("HOMEPAGE_FEATURED_COUNT", 10usize).max(1),
            popular_count: env_parse("HOMEPAGE_POPULAR_COUNT", 20usize).max(1),
            genre_count: env_parse("HOMEPAGE_GENRE_COUNT", 10usize).max(1),
            genre_names: env_list("HOMEPAGE_GENRES", DEFAULT_GENRES),
            request_delay: Duration::from_millis(env_parse(
                "HOMEPAGE_REQUEST_DELAY_MS",
                250u64,
            )),
            popularity_keywords: env_list(
                "HOMEPAGE_POPULARITY_KEYWORDS",
                DEFAULT_POPULARITY_KEYWORDS,
            ),
        })
    }
}

#[cfg(test)]
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            igdb_client_id: "client".into(),
            igdb_access_token: "token".into(),
            firestore_project_id: "project".into(),
            firestore_credentials_json: "{}".into(),
            primitive_limit: 100,
            featured_count: 10,
            popular_count: 20,
            genre_count: 10,
            genre_names: DEFAULT_GENRES.iter().map(|s| s.to_string()).collect(),
            request_delay: Duration::from_millis(0),
            popularity_keywords: DEFAULT_POPULARITY_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
