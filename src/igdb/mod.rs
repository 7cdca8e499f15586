pub mod client;
pub mod query;
pub mod records;

use anyhow::Result;
use async_trait::async_trait;

use query::GameQuery;
use records::{PopularityPrimitive, PopularityType, RawGameRecord};

/// Metadata-provider contract the homepage core depends on. The transport
/// (HTTP, query grammar, auth headers) stays behind this seam so the ranking
/// and sampling logic can be exercised against in-memory fakes.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Count of games matching a where-clause.
    async fn count_games(&self, where_clause: &str) -> Result<u64>;

    /// One page of games for the given query.
    async fn list_games(&self, query: &GameQuery) -> Result<Vec<RawGameRecord>>;

    /// Full records for one batch of identifiers. Callers are responsible for
    /// keeping batches within the provider's id-set limit.
    async fn games_by_ids(&self, ids: &[i64]) -> Result<Vec<RawGameRecord>>;

    /// All known popularity-type definitions.
    async fn popularity_types(&self) -> Result<Vec<PopularityType>>;

    /// Top primitives for one type, sorted by value descending.
    async fn popularity_primitives(
        &self,
        type_id: i64,
        limit: usize,
    ) -> Result<Vec<PopularityPrimitive>>;

    /// Exact-name genre lookup; None when the provider does not know the name.
    async fn genre_id_by_name(&self, name: &str) -> Result<Option<i64>>;
}
