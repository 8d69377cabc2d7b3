//! Common interface over the memory, semantic and exact tiers

use super::key::CacheKey;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which tier answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Memory,
    Semantic,
    Exact,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Memory => "memory",
            CacheSource::Semantic => "semantic",
            CacheSource::Exact => "exact",
        }
    }
}

impl fmt::Display for CacheSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload returned by one tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierHit {
    pub payload: serde_json::Value,
    pub similarity: Option<f32>,
}

/// Result of a hierarchy lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit {
        source: CacheSource,
        payload: serde_json::Value,
        similarity: Option<f32>,
    },
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }

    pub fn source(&self) -> Option<CacheSource> {
        match self {
            CacheLookup::Hit { source, .. } => Some(*source),
            CacheLookup::Miss => None,
        }
    }
}

/// One cache tier.
///
/// `lookup` returns `Ok(None)` on a clean miss and `Err` when the tier could
/// not be consulted at all; the hierarchy falls through in both cases.
#[async_trait]
pub trait CacheTier: Send + Sync {
    fn source(&self) -> CacheSource;

    async fn lookup(&self, key: &CacheKey) -> Result<Option<TierHit>>;

    async fn store(&self, key: &CacheKey, payload: &serde_json::Value, ttl: Duration) -> Result<()>;
}
