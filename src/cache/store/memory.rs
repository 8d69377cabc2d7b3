//! In-process persistent store
//!
//! Used for tests and for running without a database. Contents live as long
//! as the process.

use super::{cosine_similarity, PersistentStore};
use crate::cache::entry::{
    CacheEntry, EvictionPolicy, LocationRecord, PopularQuery, SimilarMatch, StoreStatistics,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    exact: HashMap<String, CacheEntry>,
    semantic: HashMap<String, CacheEntry>,
    locations: HashMap<String, LocationRecord>,
}

/// [`PersistentStore`] kept in process memory
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Semantic row for `key`, expired or not
    pub async fn semantic_entry(&self, key: &str) -> Option<CacheEntry> {
        self.tables.read().await.semantic.get(key).cloned()
    }

    /// Exact row for `key`, expired or not
    pub async fn exact_entry(&self, key: &str) -> Option<CacheEntry> {
        self.tables.read().await.exact.get(key).cloned()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

#[async_trait]
impl PersistentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_exact(&self, key: &str) -> Result<Option<CacheEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.exact.get(key).filter(|e| !e.is_expired()).cloned())
    }

    async fn upsert_exact(&self, entry: &CacheEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut entry = entry.clone();
        if let Some(previous) = tables.exact.get(&entry.key) {
            entry.access_count = previous.access_count;
        }
        tables.exact.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn find_similar(
        &self,
        query_embedding: &[f32],
        location_embedding: Option<&[f32]>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>> {
        let now = Utc::now();
        let tables = self.tables.read().await;

        let mut matches: Vec<SimilarMatch> = tables
            .semantic
            .values()
            .filter(|e| !e.is_expired_at(now))
            .filter_map(|entry| {
                let stored_query = entry.embedding_query.as_deref()?;
                let query_sim = cosine_similarity(query_embedding, stored_query);
                if query_sim < threshold {
                    return None;
                }

                let similarity = match (location_embedding, entry.embedding_location.as_deref()) {
                    (Some(wanted), Some(stored)) => {
                        let location_sim = cosine_similarity(wanted, stored);
                        if location_sim < threshold {
                            return None;
                        }
                        (query_sim + location_sim) / 2.0
                    }
                    (None, None) => query_sim,
                    _ => return None,
                };

                Some(SimilarMatch {
                    entry: entry.clone(),
                    similarity,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.entry.key.cmp(&b.entry.key))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn upsert_semantic(&self, entry: &CacheEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut entry = entry.clone();
        if let Some(previous) = tables.semantic.get(&entry.key) {
            entry.access_count = previous.access_count;
        }
        tables.semantic.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn record_access(&self, key: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.semantic.get_mut(key) {
            entry.touch();
        }
        if let Some(entry) = tables.exact.get_mut(key) {
            entry.touch();
        }
        Ok(())
    }

    async fn is_popular(&self, query: &str, location: &str, min_access: u64) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.semantic.values().any(|e| {
            e.access_count >= min_access
                && (contains_ci(&e.query, query) || contains_ci(&e.location, location))
        }))
    }

    async fn popular_queries(
        &self,
        exclude_query: &str,
        min_access: u64,
        limit: usize,
    ) -> Result<Vec<PopularQuery>> {
        let tables = self.tables.read().await;
        let mut popular: Vec<PopularQuery> = tables
            .semantic
            .values()
            .filter(|e| e.query != exclude_query && e.access_count >= min_access)
            .map(|e| PopularQuery {
                query: e.query.clone(),
                location: e.location.clone(),
                access_count: e.access_count,
            })
            .collect();

        popular.sort_by(|a, b| b.access_count.cmp(&a.access_count).then_with(|| a.query.cmp(&b.query)));
        popular.truncate(limit);
        Ok(popular)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let before = tables.exact.len() + tables.semantic.len() + tables.locations.len();

        tables.exact.retain(|_, e| !e.is_expired_at(now));
        tables.semantic.retain(|_, e| !e.is_expired_at(now));
        tables.locations.retain(|_, r| r.expires_at > now);

        let after = tables.exact.len() + tables.semantic.len() + tables.locations.len();
        Ok((before - after) as u64)
    }

    async fn statistics(&self) -> Result<StoreStatistics> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        Ok(StoreStatistics {
            exact_entries: tables.exact.len() as u64,
            semantic_entries: tables.semantic.len() as u64,
            location_entries: tables.locations.len() as u64,
            expired_entries: tables
                .exact
                .values()
                .chain(tables.semantic.values())
                .filter(|e| e.is_expired_at(now))
                .count() as u64,
            total_accesses: tables.semantic.values().map(|e| e.access_count).sum(),
        })
    }

    async fn evict(&self, policy: &EvictionPolicy) -> Result<u64> {
        let mut tables = self.tables.write().await;

        let mut victims: Vec<(chrono::DateTime<Utc>, String)> = tables
            .semantic
            .values()
            .filter(|e| {
                e.access_count < policy.max_access_count && e.last_accessed_at < policy.stale_before
            })
            .map(|e| (e.last_accessed_at, e.key.clone()))
            .collect();
        victims.sort();
        victims.truncate(policy.limit);

        for (_, key) in &victims {
            tables.semantic.remove(key);
            tables.exact.remove(key);
        }
        Ok(victims.len() as u64)
    }

    async fn get_location(&self, raw_input: &str) -> Result<Option<LocationRecord>> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        Ok(tables
            .locations
            .get(raw_input)
            .filter(|r| r.expires_at > now)
            .cloned())
    }

    async fn upsert_location(&self, record: &LocationRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .locations
            .insert(record.raw_input.clone(), record.clone());
        Ok(())
    }
}
