//! Records held by the cache tiers and the persistent store

use crate::results::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One cached orchestration result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub query: String,
    pub location: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_query: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_location: Option<Vec<f32>>,
}

impl CacheEntry {
    /// Create a fresh entry expiring `ttl` from now
    pub fn new(
        key: impl Into<String>,
        query: impl Into<String>,
        location: impl Into<String>,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            key: key.into(),
            query: query.into(),
            location: location.into(),
            payload,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
            last_accessed_at: now,
            embedding_query: None,
            embedding_location: None,
        }
    }

    pub fn with_embeddings(mut self, query: Vec<f32>, location: Option<Vec<f32>>) -> Self {
        self.embedding_query = Some(query);
        self.embedding_location = location;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Count one more access
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }
}

/// A semantic-store row ranked against a lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMatch {
    pub entry: CacheEntry,
    pub similarity: f32,
}

/// A frequently accessed (query, location) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularQuery {
    pub query: String,
    pub location: String,
    pub access_count: u64,
}

/// Cached result of resolving a free-text location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub raw_input: String,
    pub normalized: String,
    pub confidence: f64,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub expires_at: DateTime<Utc>,
}

/// Row counts reported by the persistent store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub exact_entries: u64,
    pub semantic_entries: u64,
    pub location_entries: u64,
    #[serde(default)]
    pub expired_entries: u64,
    #[serde(default)]
    pub total_accesses: u64,
}

impl StoreStatistics {
    /// Size counted against the cache ceiling
    pub fn total_size(&self) -> u64 {
        self.exact_entries + self.semantic_entries
    }
}

/// Predicate for bounded low-value eviction
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionPolicy {
    /// Rows with fewer accesses than this are candidates
    pub max_access_count: u64,
    /// Rows last accessed before this instant are candidates
    pub stale_before: DateTime<Utc>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_window() {
        let entry = CacheEntry::new("k", "q", "l", serde_json::json!({}), Duration::from_secs(60));
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(60));
        assert!(!entry.is_expired());

        let later = entry.created_at + chrono::Duration::seconds(61);
        assert!(entry.is_expired_at(later));
        assert!(entry.remaining_ttl(later).is_none());
        assert!(entry.remaining_ttl(entry.created_at).is_some());
    }

    #[test]
    fn test_touch_counts_access() {
        let mut entry = CacheEntry::new("k", "q", "l", serde_json::json!(1), Duration::from_secs(60));
        entry.touch();
        entry.touch();
        assert_eq!(entry.access_count, 2);
        assert!(entry.last_accessed_at >= entry.created_at);
    }
}
