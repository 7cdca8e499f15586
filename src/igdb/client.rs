use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::SyncConfig;

use super::query::{id_set_filter, GameQuery};
use super::records::{
    CountResponse, GenreRecord, PopularityPrimitive, PopularityType, RawGameRecord,
};
use super::Catalog;

const IGDB_API_BASE: &str = "https://api.igdb.com/v4";
const IGDB_MAX_LIMIT: usize = 500;

/// Field list fetched for every game query; wide enough for both the
/// canonical transform and the scoring inputs.
pub const GAME_FIELDS: &str = "id,name,summary,storyline,total_rating,first_release_date,\
updated_at,url,hypes,follows,cover.url,screenshots.url,genres.id,genres.name,\
player_perspectives.id,player_perspectives.name,game_engines.id,game_engines.name,\
game_modes.id,game_modes.name";

/// HTTP client for the metadata provider. One instance per run;
/// every request is followed by the configured inter-request delay.
pub struct IgdbClient {
    http: Client,
    base_url: String,
    client_id: String,
    access_token: String,
    request_delay: Duration,
}

impl IgdbClient {
    pub fn new(cfg: &SyncConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("homepage-sync/0.1")
            .build()
            .context("failed to construct IGDB HTTP client")?;
        Ok(Self {
            http,
            base_url: IGDB_API_BASE.to_string(),
            client_id: cfg.igdb_client_id.clone(),
            access_token: cfg.igdb_access_token.clone(),
            request_delay: cfg.request_delay,
        })
    }

    async fn throttle(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    async fn execute<T>(&self, resource: &str, body: String) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, resource);
        debug!(target = "igdb", resource, body = %body, "query");
        let response = self
            .http
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .with_context(|| format!("requesting {resource}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "igdb request failed (resource={resource}, status={status}): {text}"
            ));
        }
        let text = response.text().await?;
        let parsed: Vec<T> = serde_json::from_str(&text)
            .map_err(|err| anyhow!("failed to parse {resource} payload ({err}): {text}"))?;
        self.throttle().await;
        Ok(parsed)
    }

    async fn execute_count(&self, resource: &str, body: String) -> Result<u64> {
        let url = format!("{}/{}/count", self.base_url, resource);
        let response = self
            .http
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .with_context(|| format!("counting {resource}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "igdb count failed (resource={resource}, status={status}): {text}"
            ));
        }
        let parsed: CountResponse = response.json().await?;
        self.throttle().await;
        Ok(parsed.count)
    }
}

#[async_trait]
impl Catalog for IgdbClient {
    async fn count_games(&self, where_clause: &str) -> Result<u64> {
        let body = format!("where {where_clause};");
        self.execute_count("games", body).await
    }

    async fn list_games(&self, query: &GameQuery) -> Result<Vec<RawGameRecord>> {
        self.execute("games", query.render()).await
    }

    async fn games_by_ids(&self, ids: &[i64]) -> Result<Vec<RawGameRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = GameQuery::new()
            .fields(GAME_FIELDS)
            .filter(id_set_filter(ids))
            .limit(ids.len().min(IGDB_MAX_LIMIT));
        self.execute("games", query.render()).await
    }

    async fn popularity_types(&self) -> Result<Vec<PopularityType>> {
        self.execute(
            "popularity_types",
            format!("fields id,name; limit {IGDB_MAX_LIMIT};"),
        )
        .await
    }

    async fn popularity_primitives(
        &self,
        type_id: i64,
        limit: usize,
    ) -> Result<Vec<PopularityPrimitive>> {
        let body = format!(
            "fields game_id,value,popularity_type; where popularity_type = {type_id}; \
sort value desc; limit {};",
            limit.min(IGDB_MAX_LIMIT)
        );
        self.execute("popularity_primitives", body).await
    }

    async fn genre_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        let body = format!("fields id,name; where name = \"{escaped}\"; limit 1;");
        let genres: Vec<GenreRecord> = self.execute("genres", body).await?;
        Ok(genres.first().map(|g| g.id))
    }
}
