//! Exact-match tier keyed by a hash of the normalized pair

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::PersistentStore;
use super::tier::{CacheSource, CacheTier, TierHit};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct ExactTier {
    store: Arc<dyn PersistentStore>,
}

impl ExactTier {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheTier for ExactTier {
    fn source(&self) -> CacheSource {
        CacheSource::Exact
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<TierHit>> {
        let hash = key.exact_key();
        let Some(entry) = self.store.get_exact(&hash).await? else {
            return Ok(None);
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_access(&hash).await {
                warn!("Failed to record exact cache access: {}", e);
            }
        });

        Ok(Some(TierHit {
            payload: entry.payload,
            similarity: None,
        }))
    }

    async fn store(&self, key: &CacheKey, payload: &serde_json::Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(
            key.exact_key(),
            key.query.trim(),
            key.location.trim(),
            payload.clone(),
            ttl,
        );
        self.store.upsert_exact(&entry).await
    }
}
