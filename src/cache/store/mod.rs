//! Persistent store backing the semantic, exact and location caches

mod memory;
mod supabase;

pub use memory::InMemoryStore;
pub use supabase::SupabaseStore;

use super::entry::{
    CacheEntry, EvictionPolicy, LocationRecord, PopularQuery, SimilarMatch, StoreStatistics,
};
use anyhow::Result;
use async_trait::async_trait;

/// Shared, durable cache storage.
///
/// Exact and semantic rows for the same (query, location) share one key, so
/// access counts recorded through either tier land on the same semantic row.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    fn name(&self) -> &str;

    /// Non-expired exact row for `key`
    async fn get_exact(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn upsert_exact(&self, entry: &CacheEntry) -> Result<()>;

    /// Non-expired semantic rows whose similarity clears `threshold`, best first.
    ///
    /// With a location embedding both the query and the location similarity
    /// must clear the threshold and rows rank by their mean. Without one, only
    /// rows stored without a location embedding are considered.
    async fn find_similar(
        &self,
        query_embedding: &[f32],
        location_embedding: Option<&[f32]>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>>;

    async fn upsert_semantic(&self, entry: &CacheEntry) -> Result<()>;

    /// Bump the access counter and last-access time for `key`
    async fn record_access(&self, key: &str) -> Result<()>;

    /// True when a prior row whose query or location contains the given text
    /// has been accessed at least `min_access` times
    async fn is_popular(&self, query: &str, location: &str, min_access: u64) -> Result<bool>;

    /// Most accessed pairs other than `exclude_query`
    async fn popular_queries(
        &self,
        exclude_query: &str,
        min_access: u64,
        limit: usize,
    ) -> Result<Vec<PopularQuery>>;

    /// Delete expired rows, returning how many went
    async fn purge_expired(&self) -> Result<u64>;

    async fn statistics(&self) -> Result<StoreStatistics>;

    /// Delete up to `policy.limit` low-value rows
    async fn evict(&self, policy: &EvictionPolicy) -> Result<u64>;

    async fn get_location(&self, raw_input: &str) -> Result<Option<LocationRecord>>;

    async fn upsert_location(&self, record: &LocationRecord) -> Result<()>;
}

/// Cosine similarity in [-1, 1]; zero for empty or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
