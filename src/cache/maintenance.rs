//! Background cache maintenance

use super::hierarchy::{CacheHierarchy, CleanupReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shortest interval either loop may run at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the periodic cleanup sweep and memory purge.
///
/// Nothing runs until [`start`](Self::start); [`stop`](Self::stop) signals
/// both loops and waits for them to finish.
pub struct CacheMaintenance {
    cache: Arc<CacheHierarchy>,
    cleanup_interval: Duration,
    memory_interval: Duration,
    running: Mutex<Option<Running>>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CacheMaintenance {
    pub fn new(cache: Arc<CacheHierarchy>) -> Self {
        let settings = cache.settings();
        let cleanup_interval = Duration::from_secs(settings.cleanup_interval_hours * 3600);
        let memory_interval = Duration::from_secs(settings.memory_sweep_interval_secs);
        Self::with_intervals(cache, cleanup_interval, memory_interval)
    }

    pub fn with_intervals(
        cache: Arc<CacheHierarchy>,
        cleanup_interval: Duration,
        memory_interval: Duration,
    ) -> Self {
        if cleanup_interval.is_zero() || memory_interval.is_zero() {
            warn!("Zero maintenance interval raised to {:?}", MIN_INTERVAL);
        }
        Self {
            cache,
            cleanup_interval: cleanup_interval.max(MIN_INTERVAL),
            memory_interval: memory_interval.max(MIN_INTERVAL),
            running: Mutex::new(None),
        }
    }

    /// Spawn the maintenance loop. Calling this twice has no effect.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }

        let (shutdown, mut signal) = watch::channel(false);
        let cache = self.cache.clone();
        let mut cleanup = tokio::time::interval(self.cleanup_interval);
        let mut memory = tokio::time::interval(self.memory_interval);

        let handle = tokio::spawn(async move {
            // Both intervals fire immediately; skip that first tick
            cleanup.tick().await;
            memory.tick().await;

            loop {
                tokio::select! {
                    _ = cleanup.tick() => {
                        cache.cleanup().await;
                    }
                    _ = memory.tick() => {
                        cache.purge_memory().await;
                    }
                    changed = signal.changed() => {
                        if changed.is_err() || *signal.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Cache maintenance loop exited");
        });

        info!(
            cleanup_secs = self.cleanup_interval.as_secs(),
            memory_secs = self.memory_interval.as_secs(),
            "Cache maintenance started"
        );
        *running = Some(Running { shutdown, handle });
    }

    /// Stop the maintenance loop if it is running
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        let _ = running.shutdown.send(true);
        let _ = running.handle.await;
        info!("Cache maintenance stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run the cleanup sweep now
    pub async fn trigger_cleanup(&self) -> CleanupReport {
        self.cache.cleanup().await
    }

    /// Purge the memory tier now
    pub async fn trigger_memory_purge(&self) -> u64 {
        self.cache.purge_memory().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryStore;
    use crate::config::CacheSettings;
    use crate::metrics::Metrics;
    use crate::testing::CountingEmbedder;
    use serde_json::json;

    fn cache() -> Arc<CacheHierarchy> {
        Arc::new(CacheHierarchy::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(CountingEmbedder::default()),
            Arc::new(Metrics::new()),
            CacheSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_start_stop() {
        let maintenance = CacheMaintenance::with_intervals(
            cache(),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );
        assert!(!maintenance.is_running().await);

        maintenance.start().await;
        maintenance.start().await;
        assert!(maintenance.is_running().await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        maintenance.stop().await;
        assert!(!maintenance.is_running().await);
        // Stopping twice is harmless
        maintenance.stop().await;
    }

    #[tokio::test]
    async fn test_memory_purge_runs_in_background() {
        let cache = cache();
        cache
            .store("short lived", "", &json!({}), Some(Duration::from_millis(20)))
            .await;

        let maintenance = CacheMaintenance::with_intervals(
            cache.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(30),
        );
        maintenance.start().await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        maintenance.stop().await;

        assert_eq!(cache.lookup("short lived", "").await.source(), None);
    }

    #[tokio::test]
    async fn test_zero_intervals_do_not_panic() {
        let settings = CacheSettings {
            cleanup_interval_hours: 0,
            memory_sweep_interval_secs: 0,
            ..Default::default()
        };
        let cache = Arc::new(CacheHierarchy::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(CountingEmbedder::default()),
            Arc::new(Metrics::new()),
            settings,
        ));
        let maintenance = CacheMaintenance::new(cache);

        maintenance.start().await;
        assert!(maintenance.is_running().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        maintenance.stop().await;
        assert!(!maintenance.is_running().await);
    }

    #[tokio::test]
    async fn test_manual_cleanup() {
        let maintenance = CacheMaintenance::new(cache());
        let report = maintenance.trigger_cleanup().await;
        assert!(report.success);
        assert_eq!(report.evicted, 0);
        assert_eq!(maintenance.trigger_memory_purge().await, 0);
    }
}
