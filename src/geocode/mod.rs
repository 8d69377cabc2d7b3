//! Location resolution
//!
//! A [`Geocoder`] turns free text into a normalized place; the
//! [`LocationResolver`] puts the store's location cache in front of it and
//! degrades to the raw input when geocoding fails.

mod geoapify;

pub use geoapify::Geoapify;

use crate::cache::{LocationRecord, PersistentStore};
use crate::results::Coordinates;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Confidence reported when the raw input is used as-is
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// A normalized location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub normalized: String,
    pub confidence: f64,
    pub coordinates: Option<Coordinates>,
}

impl ResolvedLocation {
    fn fallback(raw: &str) -> Self {
        Self {
            normalized: raw.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            coordinates: None,
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best candidate for `raw`, `None` when nothing matched
    async fn resolve(&self, raw: &str) -> Result<Option<ResolvedLocation>>;
}

/// Geocoder used when none is configured; never matches
pub struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn resolve(&self, _raw: &str) -> Result<Option<ResolvedLocation>> {
        Ok(None)
    }
}

/// Cache-backed location normalization
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    store: Arc<dyn PersistentStore>,
    ttl: Duration,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, store: Arc<dyn PersistentStore>, ttl: Duration) -> Self {
        Self { geocoder, store, ttl }
    }

    /// Resolve `raw`. Never fails: geocoder errors and empty answers fall
    /// back to the raw text with [`FALLBACK_CONFIDENCE`], and that fallback
    /// is cached like any other answer.
    pub async fn resolve(&self, raw: &str) -> ResolvedLocation {
        let cache_key = raw.trim().to_lowercase();

        match self.store.get_location(&cache_key).await {
            Ok(Some(record)) => {
                debug!(raw = %raw, normalized = %record.normalized, "Location cache hit");
                return ResolvedLocation {
                    normalized: record.normalized,
                    confidence: record.confidence,
                    coordinates: record.coordinates,
                };
            }
            Ok(None) => {}
            Err(e) => debug!("Location cache read failed: {}", e),
        }

        let resolved = match self.geocoder.resolve(raw).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                debug!(raw = %raw, "Geocoder found no candidates");
                ResolvedLocation::fallback(raw)
            }
            Err(e) => {
                warn!(raw = %raw, "Geocoding failed: {}", e);
                ResolvedLocation::fallback(raw)
            }
        };

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let record = LocationRecord {
            raw_input: cache_key,
            normalized: resolved.normalized.clone(),
            confidence: resolved.confidence,
            coordinates: resolved.coordinates,
            expires_at: Utc::now() + ttl,
        };
        if let Err(e) = self.store.upsert_location(&record).await {
            debug!("Location cache write failed: {}", e);
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryStore;
    use crate::testing::FailingStore;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGeocoder {
        answer: Option<ResolvedLocation>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedGeocoder {
        fn new(answer: Option<ResolvedLocation>, fail: bool) -> Self {
            Self {
                answer,
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn resolve(&self, _raw: &str) -> Result<Option<ResolvedLocation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("geocoder down");
            }
            Ok(self.answer.clone())
        }
    }

    fn pikeville() -> ResolvedLocation {
        ResolvedLocation {
            normalized: "Pikeville, Kentucky, United States".to_string(),
            confidence: 0.95,
            coordinates: Some(Coordinates::new(37.4793, -82.5188)),
        }
    }

    #[tokio::test]
    async fn test_resolves_and_caches() {
        let geocoder = Arc::new(FixedGeocoder::new(Some(pikeville()), false));
        let resolver = LocationResolver::new(
            geocoder.clone(),
            Arc::new(InMemoryStore::new()),
            Duration::from_secs(86_400),
        );

        assert_eq!(resolver.resolve("Pikeville KY").await, pikeville());
        assert_eq!(resolver.resolve("pikeville ky ").await, pikeville());
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_is_cached() {
        let geocoder = Arc::new(FixedGeocoder::new(None, true));
        let resolver = LocationResolver::new(
            geocoder.clone(),
            Arc::new(InMemoryStore::new()),
            Duration::from_secs(86_400),
        );

        let resolved = resolver.resolve("Nowhere Holler").await;
        assert_eq!(resolved.normalized, "Nowhere Holler");
        assert_eq!(resolved.confidence, FALLBACK_CONFIDENCE);
        assert!(resolved.coordinates.is_none());

        resolver.resolve("Nowhere Holler").await;
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_failure_still_resolves() {
        let resolver = LocationResolver::new(
            Arc::new(FixedGeocoder::new(Some(pikeville()), false)),
            Arc::new(FailingStore),
            Duration::from_secs(60),
        );
        assert_eq!(resolver.resolve("Pikeville").await, pikeville());
    }
}
