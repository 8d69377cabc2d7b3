//! Metrics collection module
//!
//! Tracks cache tier hit counters, lookup latency, and per-provider
//! reliability and response times.

use crate::cache::CacheSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

const RESPONSE_TIME_WINDOW: usize = 100;

/// Process-wide metrics collector
pub struct Metrics {
    /// Total search count
    pub total_searches: AtomicU64,
    cache: RwLock<CacheCounters>,
    /// Provider response times (rolling window in ms)
    provider_response_times: RwLock<HashMap<String, Vec<u64>>>,
    provider_errors: RwLock<HashMap<String, u64>>,
    provider_successes: RwLock<HashMap<String, u64>>,
}

/// Cache lookup counters since the last reset
#[derive(Debug, Clone, Serialize)]
pub struct CacheCounters {
    pub total_lookups: u64,
    pub memory_hits: u64,
    pub semantic_hits: u64,
    pub exact_hits: u64,
    pub semantic_misses: u64,
    pub misses: u64,
    pub average_latency_ms: f64,
    pub last_reset: DateTime<Utc>,
}

impl Default for CacheCounters {
    fn default() -> Self {
        Self {
            total_lookups: 0,
            memory_hits: 0,
            semantic_hits: 0,
            exact_hits: 0,
            semantic_misses: 0,
            misses: 0,
            average_latency_ms: 0.0,
            last_reset: Utc::now(),
        }
    }
}

impl CacheCounters {
    pub fn hits(&self) -> u64 {
        self.memory_hits + self.semantic_hits + self.exact_hits
    }

    /// Share of lookups answered by any tier, in percent
    pub fn hit_rate(&self) -> f64 {
        if self.total_lookups == 0 {
            return 0.0;
        }
        self.hits() as f64 / self.total_lookups as f64 * 100.0
    }

    /// Share of semantic attempts that matched, in percent
    pub fn vector_hit_rate(&self) -> f64 {
        let attempts = self.semantic_hits + self.semantic_misses;
        if attempts == 0 {
            return 0.0;
        }
        self.semantic_hits as f64 / attempts as f64 * 100.0
    }

    fn observe_latency(&mut self, latency_ms: u64) {
        self.total_lookups += 1;
        let n = self.total_lookups as f64;
        self.average_latency_ms += (latency_ms as f64 - self.average_latency_ms) / n;
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            cache: RwLock::new(CacheCounters::default()),
            provider_response_times: RwLock::new(HashMap::new()),
            provider_errors: RwLock::new(HashMap::new()),
            provider_successes: RwLock::new(HashMap::new()),
        }
    }

    /// Increment total search count
    pub fn inc_search(&self) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total_searches(&self) -> u64 {
        self.total_searches.load(Ordering::Relaxed)
    }

    /// Record a lookup answered by `source`
    pub fn record_cache_hit(&self, source: CacheSource, latency_ms: u64) {
        let mut cache = self.cache.write().unwrap();
        match source {
            CacheSource::Memory => cache.memory_hits += 1,
            CacheSource::Semantic => cache.semantic_hits += 1,
            CacheSource::Exact => cache.exact_hits += 1,
        }
        cache.observe_latency(latency_ms);
    }

    /// Record a lookup that fell through every tier
    pub fn record_cache_miss(&self, latency_ms: u64) {
        let mut cache = self.cache.write().unwrap();
        cache.misses += 1;
        cache.observe_latency(latency_ms);
    }

    /// Record a semantic tier attempt that found no match
    pub fn record_semantic_miss(&self) {
        self.cache.write().unwrap().semantic_misses += 1;
    }

    pub fn cache_counters(&self) -> CacheCounters {
        self.cache.read().unwrap().clone()
    }

    /// Zero the cache counters and stamp a new reset time
    pub fn reset_cache(&self) {
        *self.cache.write().unwrap() = CacheCounters::default();
    }

    /// Record provider response time
    pub fn record_response_time(&self, provider: &str, time_ms: u64) {
        let mut times = self.provider_response_times.write().unwrap();
        let entry = times.entry(provider.to_string()).or_default();

        if entry.len() >= RESPONSE_TIME_WINDOW {
            entry.remove(0);
        }
        entry.push(time_ms);
    }

    pub fn record_error(&self, provider: &str) {
        let mut errors = self.provider_errors.write().unwrap();
        *errors.entry(provider.to_string()).or_insert(0) += 1;
    }

    pub fn record_success(&self, provider: &str) {
        let mut successes = self.provider_successes.write().unwrap();
        *successes.entry(provider.to_string()).or_insert(0) += 1;
    }

    /// Average response time for a provider
    pub fn get_avg_response_time(&self, provider: &str) -> Option<u64> {
        let times = self.provider_response_times.read().unwrap();
        times.get(provider).and_then(|t| {
            if t.is_empty() {
                None
            } else {
                Some(t.iter().sum::<u64>() / t.len() as u64)
            }
        })
    }

    /// Reliability percentage for a provider
    pub fn get_reliability(&self, provider: &str) -> f64 {
        let errors = self.provider_errors.read().unwrap();
        let successes = self.provider_successes.read().unwrap();

        let error_count = *errors.get(provider).unwrap_or(&0);
        let success_count = *successes.get(provider).unwrap_or(&0);

        let total = error_count + success_count;
        if total == 0 {
            100.0
        } else {
            (success_count as f64 / total as f64) * 100.0
        }
    }

    /// Statistics for every provider that has been called
    pub fn get_provider_stats(&self) -> HashMap<String, ProviderStats> {
        let mut names: Vec<String> = {
            let errors = self.provider_errors.read().unwrap();
            let successes = self.provider_successes.read().unwrap();
            errors.keys().chain(successes.keys()).cloned().collect()
        };
        names.sort();
        names.dedup();

        names
            .into_iter()
            .map(|name| {
                let stats = ProviderStats {
                    successes: *self.provider_successes.read().unwrap().get(&name).unwrap_or(&0),
                    errors: *self.provider_errors.read().unwrap().get(&name).unwrap_or(&0),
                    avg_response_time: self.get_avg_response_time(&name),
                    reliability: self.get_reliability(&name),
                };
                (name, stats)
            })
            .collect()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub successes: u64,
    pub errors: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}
