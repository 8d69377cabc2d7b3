//! In-process memory tier

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::tier::{CacheSource, CacheTier, TierHit};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Expires each entry at its own `expires_at`
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining_ttl(Utc::now()).unwrap_or(Duration::ZERO))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.remaining_ttl(Utc::now()).unwrap_or(Duration::ZERO))
    }
}

/// Process-local cache of full entries, keyed by [`CacheKey::memory_key`]
pub struct MemoryTier {
    cache: Cache<String, CacheEntry>,
    /// Entries expired since the last purge
    expired: Arc<AtomicU64>,
}

impl MemoryTier {
    pub fn new(max_capacity: u64) -> Self {
        let expired = Arc::new(AtomicU64::new(0));
        let counter = expired.clone();
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .eviction_listener(move |_key, _entry, cause| {
                if cause == RemovalCause::Expired {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self { cache, expired }
    }

    /// Live entry for `key`, without counting an access
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.cache
            .get(&key.memory_key())
            .await
            .filter(|entry| !entry.is_expired())
    }

    pub async fn insert(&self, key: &CacheKey, entry: CacheEntry) {
        self.cache.insert(key.memory_key(), entry).await;
    }

    /// Drop every expired entry, returning how many expired since the
    /// previous purge
    pub async fn purge_expired(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.expired.swap(0, Ordering::Relaxed)
    }

    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn source(&self) -> CacheSource {
        CacheSource::Memory
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<TierHit>> {
        // The access update runs under the key's lock, so a concurrent store
        // is never overwritten by the entry read here
        let result = self
            .cache
            .entry(key.memory_key())
            .and_compute_with(|current| {
                let op = match current.map(|e| e.into_value()) {
                    Some(entry) if entry.is_expired() => Op::Remove,
                    Some(mut entry) => {
                        entry.touch();
                        Op::Put(entry)
                    }
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        let hit = match result {
            CompResult::ReplacedWith(entry) => Some(TierHit {
                payload: entry.into_value().payload,
                similarity: None,
            }),
            _ => None,
        };
        Ok(hit)
    }

    async fn store(&self, key: &CacheKey, payload: &serde_json::Value, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(key.memory_key(), &key.query, &key.location, payload.clone(), ttl);
        self.insert(key, entry).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_and_lookup_case_insensitive() {
        let tier = MemoryTier::new(100);
        tier.store(&CacheKey::new("Hidden Gems", ""), &json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = tier.lookup(&CacheKey::new("hidden gems", "")).await.unwrap();
        assert_eq!(hit.unwrap().payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_hit_counts_access_and_keeps_expiry() {
        let tier = MemoryTier::new(100);
        let key = CacheKey::new("q", "l");
        tier.store(&key, &json!(1), Duration::from_secs(60)).await.unwrap();
        let original = tier.get(&key).await.unwrap();

        tier.lookup(&key).await.unwrap();
        tier.lookup(&key).await.unwrap();

        let entry = tier.get(&key).await.unwrap();
        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.expires_at, original.expires_at);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_read() {
        let tier = MemoryTier::new(100);
        let key = CacheKey::new("q", "l");
        let mut entry = CacheEntry::new(key.memory_key(), "q", "l", json!(1), Duration::from_secs(60));
        entry.expires_at = Utc::now() - chrono::Duration::seconds(1);
        tier.insert(&key, entry).await;

        assert!(tier.lookup(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_counts_expired() {
        let tier = MemoryTier::new(100);
        tier.store(&CacheKey::new("live", ""), &json!(1), Duration::from_secs(60))
            .await
            .unwrap();
        for name in ["short a", "short b", "short c"] {
            tier.store(&CacheKey::new(name, ""), &json!(1), Duration::from_millis(20))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(tier.purge_expired().await, 3);
        assert_eq!(tier.size(), 1);
        assert!(tier.get(&CacheKey::new("live", "")).await.is_some());
        assert!(tier.get(&CacheKey::new("short a", "")).await.is_none());

        // Already counted
        assert_eq!(tier.purge_expired().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hits_never_revert_a_concurrent_store() {
        let tier = Arc::new(MemoryTier::new(100));
        let key = CacheKey::new("q", "l");

        for round in 0..200 {
            tier.store(&key, &json!({"v": "old"}), Duration::from_secs(60))
                .await
                .unwrap();

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let tier = tier.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        for _ in 0..5 {
                            tier.lookup(&key).await.unwrap();
                        }
                    })
                })
                .collect();
            tier.store(&key, &json!({"v": "new"}), Duration::from_secs(60))
                .await
                .unwrap();
            for reader in readers {
                reader.await.unwrap();
            }

            let hit = tier.lookup(&key).await.unwrap().unwrap();
            assert_eq!(hit.payload, json!({"v": "new"}), "round {} served stale payload", round);
        }
    }
}
