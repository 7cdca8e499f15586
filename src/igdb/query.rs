//! Body builder for the provider's fields/where/sort/limit/offset grammar.

/// Theme id the provider uses for adult-only content; excluded everywhere.
pub const MATURE_THEME_ID: i64 = 42;
/// Base "game" entries only (no DLC, bundles, mods).
pub const BASE_GAME_TYPE: i64 = 0;
/// Floor applied to genre-section candidates.
pub const MIN_GENRE_RATING: f64 = 50.0;

/// One query against the games resource. Renders to the provider's
/// semicolon-terminated clause grammar.
#[derive(Debug, Clone, Default)]
pub struct GameQuery {
    fields: Option<String>,
    filters: Vec<String>,
    sort: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl GameQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: &str) -> Self {
        self.fields = Some(fields.to_string());
        self
    }

    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !clause.trim().is_empty() {
            self.filters.push(clause);
        }
        self
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort = Some(format!("{field} desc"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn where_clause(&self) -> String {
        self.filters.join(" & ")
    }

    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(fields) = &self.fields {
            parts.push(format!("fields {fields};"));
        }
        if !self.filters.is_empty() {
            parts.push(format!("where {};", self.where_clause()));
        }
        if let Some(sort) = &self.sort {
            parts.push(format!("sort {sort};"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit {limit};"));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("offset {offset};"));
        }
        parts.join(" ")
    }
}

/// Content filter shared by every section: has a cover, not mature, base game.
pub fn base_content_filter() -> String {
    format!("cover != null & themes != ({MATURE_THEME_ID}) & game_type = {BASE_GAME_TYPE}")
}

/// Genre sections additionally pin a provider genre id and a rating floor.
pub fn genre_content_filter(genre_id: i64) -> String {
    format!(
        "{} & genres = ({genre_id}) & total_rating >= {MIN_GENRE_RATING}",
        base_content_filter()
    )
}

pub fn id_set_filter(ids: &[i64]) -> String {
    let list = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("id = ({list})")
}
