//! Pure raw-to-canonical record mapping. No I/O, total: absent fields are
//! omitted from the canonical record and malformed classification entries
//! are dropped per item, never the whole record.

use serde::{Deserialize, Serialize};

use crate::igdb::records::{NamedRef, RawGameRecord};

const THUMB_TOKEN: &str = "t_thumb";
const COVER_SIZE: &str = "t_cover_big";
const SCREENSHOT_SIZE: &str = "t_screenshot_med";

/// Flattened record shape used everywhere downstream of the provider.
/// Optionals serialize as omitted keys, not nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGameRecord {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storyline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_perspectives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_engines: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_modes: Option<Vec<String>>,
}

pub fn transform(raw: &RawGameRecord) -> CanonicalGameRecord {
    CanonicalGameRecord {
        id: raw.id,
        name: raw.name.clone(),
        summary: raw.summary.clone(),
        storyline: raw.storyline.clone(),
        total_rating: raw.total_rating,
        first_release_date: raw.first_release_date,
        url: raw.url.clone(),
        cover_url: raw
            .cover
            .as_ref()
            .and_then(|c| c.url.as_deref())
            .map(|u| rewrite_image_url(u, COVER_SIZE)),
        screenshots: raw.screenshots.as_ref().map(|shots| {
            shots
                .iter()
                .filter_map(|s| s.url.as_deref())
                .map(|u| rewrite_image_url(u, SCREENSHOT_SIZE))
                .collect()
        }),
        genres: flatten_names(raw.genres.as_deref()),
        player_perspectives: flatten_names(raw.player_perspectives.as_deref()),
        game_engines: flatten_names(raw.game_engines.as_deref()),
        game_modes: flatten_names(raw.game_modes.as_deref()),
    }
}

/// Swap the thumbnail size token for a full-resolution one and fix
/// protocol-relative URLs. No-op on already-rewritten input.
fn rewrite_image_url(raw: &str, size: &str) -> String {
    let sized = raw.replace(THUMB_TOKEN, size);
    if sized.starts_with("//") {
        format!("https:{sized}")
    } else {
        sized
    }
}

/// Per-item validation of classification entries: entries without a usable
/// name are discarded, the rest survive. Absent input stays absent.
fn flatten_names(items: Option<&[NamedRef]>) -> Option<Vec<String>> {
    items.map(|list| {
        list.iter()
            .filter_map(|entry| match entry.name.as_deref() {
                Some(name) if !name.trim().is_empty() => Some(name.to_string()),
                _ => None,
            })
            .collect()
    })
}
