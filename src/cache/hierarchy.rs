//! Three-tier cache hierarchy

use super::entry::{EvictionPolicy, PopularQuery, StoreStatistics};
use super::exact::ExactTier;
use super::key::CacheKey;
use super::memory::MemoryTier;
use super::semantic::SemanticTier;
use super::store::PersistentStore;
use super::tier::{CacheLookup, CacheSource, CacheTier};
use crate::config::CacheSettings;
use crate::embedding::EmbeddingProvider;
use crate::metrics::{CacheCounters, Metrics};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// TTL used when settings resolve to zero
const MIN_TTL: Duration = Duration::from_secs(1);

/// Snapshot returned by [`CacheHierarchy::analytics`]
#[derive(Debug, Clone, Serialize)]
pub struct CacheAnalytics {
    /// Persistent store figures, absent when the store could not be reached
    pub store: Option<StoreStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
    pub memory_entries: u64,
    pub hit_rate: f64,
    pub vector_hit_rate: f64,
    pub counters: CacheCounters,
    pub config: CacheSettings,
    pub last_reset: DateTime<Utc>,
}

/// Outcome of one cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub success: bool,
    pub purged: u64,
    pub evicted: u64,
    pub total_size: u64,
    pub memory_purged: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Looks for popular pairs that are no longer cached. Never calls providers.
#[derive(Clone)]
struct CacheWarmer {
    store: Arc<dyn PersistentStore>,
    memory: Arc<MemoryTier>,
    batch_size: usize,
    min_access: u64,
    step: Duration,
}

impl CacheWarmer {
    async fn warm_related(&self, query: &str) -> Result<Vec<PopularQuery>> {
        let popular = self
            .store
            .popular_queries(query, self.min_access, self.batch_size)
            .await?;

        let mut opportunities = Vec::new();
        for candidate in popular {
            let key = CacheKey::new(&candidate.query, &candidate.location);
            let cached = self.memory.get(&key).await.is_some()
                || matches!(self.store.get_exact(&key.exact_key()).await, Ok(Some(_)));

            if !cached {
                debug!(
                    query = %candidate.query,
                    location = %candidate.location,
                    access_count = candidate.access_count,
                    "Warming opportunity"
                );
                opportunities.push(candidate);
            }
            tokio::time::sleep(self.step).await;
        }

        Ok(opportunities)
    }
}

/// Memory, semantic and exact tiers behind one lookup/store interface
pub struct CacheHierarchy {
    memory: Arc<MemoryTier>,
    semantic: Arc<dyn CacheTier>,
    exact: Arc<dyn CacheTier>,
    store: Arc<dyn PersistentStore>,
    warmer: CacheWarmer,
    metrics: Arc<Metrics>,
    settings: CacheSettings,
}

impl CacheHierarchy {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        metrics: Arc<Metrics>,
        settings: CacheSettings,
    ) -> Self {
        let memory = Arc::new(MemoryTier::new(settings.memory_capacity));
        let semantic = Arc::new(SemanticTier::new(
            store.clone(),
            embedder,
            settings.similarity_threshold,
            settings.max_cache_results,
            settings.embedding_timeout(),
        ));
        let exact = Arc::new(ExactTier::new(store.clone()));
        let warmer = CacheWarmer {
            store: store.clone(),
            memory: memory.clone(),
            batch_size: settings.warmup_batch_size,
            min_access: settings.warmup_min_access,
            step: Duration::from_millis(settings.warmup_step_ms),
        };

        Self {
            memory,
            semantic,
            exact,
            store,
            warmer,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn persistent_store(&self) -> &Arc<dyn PersistentStore> {
        &self.store
    }

    /// Look up a pair, stopping at the first tier that answers
    pub async fn lookup(&self, query: &str, location: &str) -> CacheLookup {
        let started = Instant::now();
        let key = CacheKey::new(query, location);
        let result = self.lookup_tiers(&key).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result.source() {
            Some(source) => {
                info!(source = %source, elapsed_ms, "Cache hit");
                self.metrics.record_cache_hit(source, elapsed_ms);
            }
            None => {
                debug!(elapsed_ms, "Cache miss");
                self.metrics.record_cache_miss(elapsed_ms);
            }
        }

        if elapsed_ms > self.settings.slow_lookup_ms {
            warn!(elapsed_ms, query = %query, "Slow cache lookup");
        }

        result
    }

    async fn lookup_tiers(&self, key: &CacheKey) -> CacheLookup {
        let tiers: [&dyn CacheTier; 3] = [self.memory.as_ref(), self.semantic.as_ref(), self.exact.as_ref()];

        for tier in tiers {
            let source = tier.source();
            match tier.lookup(key).await {
                Ok(Some(hit)) => {
                    if source == CacheSource::Semantic {
                        self.promote(key, &hit.payload).await;
                    }
                    return CacheLookup::Hit {
                        source,
                        payload: hit.payload,
                        similarity: hit.similarity,
                    };
                }
                Ok(None) => {
                    if source == CacheSource::Semantic {
                        self.metrics.record_semantic_miss();
                    }
                }
                Err(e) => debug!(tier = %source, "Cache tier skipped: {}", e),
            }
        }

        CacheLookup::Miss
    }

    async fn promote(&self, key: &CacheKey, payload: &serde_json::Value) {
        if let Err(e) = self.memory.store(key, payload, self.settings.default_ttl()).await {
            debug!("Memory promotion failed: {}", e);
        }
    }

    /// TTL for a new entry: long when the query or location has been popular
    pub async fn adaptive_ttl(&self, query: &str, location: &str, ttl_hint: Option<Duration>) -> Duration {
        let short = ttl_hint
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or_else(|| self.settings.default_ttl());
        let ttl = match self
            .store
            .is_popular(query, location, self.settings.popularity_threshold)
            .await
        {
            Ok(true) => self.settings.popular_ttl(),
            Ok(false) => short,
            Err(e) => {
                debug!("Popularity check failed: {}", e);
                short
            }
        };
        // Entries must outlive their own creation
        if ttl.is_zero() {
            MIN_TTL
        } else {
            ttl
        }
    }

    /// Write a payload through every tier.
    ///
    /// Returns true when at least one persistent tier accepted the write. On
    /// success a warming pass is scheduled in the background.
    pub async fn store(
        &self,
        query: &str,
        location: &str,
        payload: &serde_json::Value,
        ttl_hint: Option<Duration>,
    ) -> bool {
        let key = CacheKey::new(query, location);
        let ttl = self.adaptive_ttl(query, location, ttl_hint).await;

        let (semantic, exact) = tokio::join!(
            self.semantic.store(&key, payload, ttl),
            self.exact.store(&key, payload, ttl)
        );
        if let Err(e) = &semantic {
            debug!("Semantic cache write skipped: {}", e);
        }
        if let Err(e) = &exact {
            warn!("Exact cache write failed: {}", e);
        }

        if let Err(e) = self.memory.store(&key, payload, ttl).await {
            debug!("Memory cache write failed: {}", e);
        }

        let stored = semantic.is_ok() || exact.is_ok();
        if stored {
            info!(ttl_secs = ttl.as_secs(), "Cached search result");
            self.schedule_warming(query.to_string());
        } else {
            warn!("Search result was not persisted by any tier");
        }
        stored
    }

    fn schedule_warming(&self, query: String) {
        let warmer = self.warmer.clone();
        let delay = Duration::from_millis(self.settings.warmup_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match warmer.warm_related(&query).await {
                Ok(found) if !found.is_empty() => {
                    info!(count = found.len(), "Found cache warming opportunities")
                }
                Ok(_) => {}
                Err(e) => warn!("Cache warming failed: {}", e),
            }
        });
    }

    /// Popular pairs other than `query` that are not currently cached
    pub async fn warm_related(&self, query: &str) -> Result<Vec<PopularQuery>> {
        self.warmer.warm_related(query).await
    }

    pub async fn analytics(&self) -> CacheAnalytics {
        let counters = self.metrics.cache_counters();
        let (store, store_error) = match self.store.statistics().await {
            Ok(stats) => (Some(stats), None),
            Err(e) => {
                warn!("Cache statistics unavailable: {}", e);
                (None, Some(e.to_string()))
            }
        };

        CacheAnalytics {
            store,
            store_error,
            memory_entries: self.memory.size(),
            hit_rate: counters.hit_rate(),
            vector_hit_rate: counters.vector_hit_rate(),
            last_reset: counters.last_reset,
            counters,
            config: self.settings.clone(),
        }
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset_cache();
        info!("Cache metrics reset");
    }

    /// Purge expired rows, evict low-value rows above the size ceiling, and
    /// purge the memory tier
    pub async fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        match self.sweep_persistent(&mut report).await {
            Ok(()) => report.success = true,
            Err(e) => {
                warn!("Cache cleanup failed: {}", e);
                report.error = Some(e.to_string());
            }
        }
        report.memory_purged = self.purge_memory().await;

        info!(
            purged = report.purged,
            evicted = report.evicted,
            total_size = report.total_size,
            memory_purged = report.memory_purged,
            "Cache cleanup finished"
        );
        report
    }

    async fn sweep_persistent(&self, report: &mut CleanupReport) -> Result<()> {
        report.purged = self.store.purge_expired().await?;
        report.total_size = self.store.statistics().await?.total_size();

        if report.total_size > self.settings.max_cache_size {
            let policy = EvictionPolicy {
                max_access_count: self.settings.eviction_max_access,
                stale_before: Utc::now() - chrono::Duration::days(self.settings.eviction_stale_days),
                limit: self.settings.eviction_batch_size,
            };
            report.evicted = self.store.evict(&policy).await?;
        }
        Ok(())
    }

    pub async fn purge_memory(&self) -> u64 {
        let purged = self.memory.purge_expired().await;
        if purged > 0 {
            debug!(purged, "Purged expired memory entries");
        }
        purged
    }

    /// Drop the whole memory tier
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    pub fn memory_size(&self) -> u64 {
        self.memory.size()
    }
}
