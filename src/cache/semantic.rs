//! Embedding-similarity tier

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::PersistentStore;
use super::tier::{CacheSource, CacheTier, TierHit};
use crate::embedding::EmbeddingProvider;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Matches lookups against previously stored queries by embedding similarity
pub struct SemanticTier {
    store: Arc<dyn PersistentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    limit: usize,
    embedding_timeout: Duration,
}

impl SemanticTier {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        threshold: f32,
        limit: usize,
        embedding_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            threshold,
            limit,
            embedding_timeout,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.embedding_timeout, self.embedder.embed(text))
            .await
            .map_err(|_| anyhow!("embedding timed out after {:?}", self.embedding_timeout))?
    }

    /// Query and location embeddings, computed concurrently. An empty
    /// location has no embedding.
    async fn embed_pair(&self, key: &CacheKey) -> Result<(Vec<f32>, Option<Vec<f32>>)> {
        let location = async {
            if key.has_location() {
                self.embed(&key.location).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let (query, location) = tokio::join!(self.embed(&key.query), location);
        Ok((query?, location?))
    }
}

#[async_trait]
impl CacheTier for SemanticTier {
    fn source(&self) -> CacheSource {
        CacheSource::Semantic
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<TierHit>> {
        let (query_embedding, location_embedding) = self.embed_pair(key).await?;

        let matches = self
            .store
            .find_similar(
                &query_embedding,
                location_embedding.as_deref(),
                self.threshold,
                self.limit,
            )
            .await?;

        let Some(best) = matches.into_iter().next() else {
            return Ok(None);
        };

        debug!(
            similarity = best.similarity,
            cached_query = %best.entry.query,
            "Semantic match"
        );

        let store = self.store.clone();
        let cache_key = best.entry.key.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_access(&cache_key).await {
                warn!("Failed to record semantic cache access: {}", e);
            }
        });

        Ok(Some(TierHit {
            payload: best.entry.payload,
            similarity: Some(best.similarity),
        }))
    }

    async fn store(&self, key: &CacheKey, payload: &serde_json::Value, ttl: Duration) -> Result<()> {
        let (query_embedding, location_embedding) = self.embed_pair(key).await?;
        let entry = CacheEntry::new(
            key.exact_key(),
            key.query.trim(),
            key.location.trim(),
            payload.clone(),
            ttl,
        )
        .with_embeddings(query_embedding, location_embedding);

        self.store.upsert_semantic(&entry).await
    }
}
