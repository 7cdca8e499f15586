use serde::Deserialize;

/// Nested image reference as the provider ships it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub url: Option<String>,
}

/// Classification entry ({id, name}); entries missing a name are dropped
/// during flattening rather than failing the whole record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Provider-native game record. Everything beyond the id is optional; absent
/// fields deserialize to None instead of failing the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGameRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub storyline: Option<String>,
    #[serde(default)]
    pub total_rating: Option<f64>,
    #[serde(default)]
    pub first_release_date: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hypes: Option<i64>,
    #[serde(default)]
    pub follows: Option<i64>,
    #[serde(default)]
    pub cover: Option<ImageRef>,
    #[serde(default)]
    pub screenshots: Option<Vec<ImageRef>>,
    #[serde(default)]
    pub genres: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub player_perspectives: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub game_engines: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub game_modes: Option<Vec<NamedRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularityType {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// One (game, signal-type, value) observation. The provider guarantees at
/// most one row per pair within a fetch; a game absent for a type counts as
/// value 0 downstream, not as excluded.
#[derive(Debug, Clone, Deserialize)]
pub struct PopularityPrimitive {
    pub game_id: i64,
    #[serde(default)]
    pub value: f64,
    pub popularity_type: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenreRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}
