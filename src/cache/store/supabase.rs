//! Supabase (PostgREST) persistent store

use super::PersistentStore;
use crate::cache::entry::{
    CacheEntry, EvictionPolicy, LocationRecord, PopularQuery, SimilarMatch, StoreStatistics,
};
use crate::config::SupabaseSettings;
use crate::network::{HttpClient, HttpRequest};
use crate::results::Coordinates;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const EXACT_TABLE: &str = "search_results";
const SEMANTIC_TABLE: &str = "semantic_cache";
const LOCATION_TABLE: &str = "location_cache";

#[derive(Debug, Serialize, Deserialize)]
struct ExactRow {
    query_hash: String,
    intent: String,
    location: String,
    results_json: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    access_count: u64,
    #[serde(default = "Utc::now")]
    last_accessed: DateTime<Utc>,
}

impl From<&CacheEntry> for ExactRow {
    fn from(e: &CacheEntry) -> Self {
        Self {
            query_hash: e.key.clone(),
            intent: e.query.trim().to_string(),
            location: e.location.trim().to_string(),
            results_json: e.payload.clone(),
            created_at: e.created_at,
            expires_at: e.expires_at,
            access_count: e.access_count,
            last_accessed: e.last_accessed_at,
        }
    }
}

impl From<ExactRow> for CacheEntry {
    fn from(row: ExactRow) -> Self {
        Self {
            key: row.query_hash,
            query: row.intent,
            location: row.location,
            payload: row.results_json,
            created_at: row.created_at,
            expires_at: row.expires_at,
            access_count: row.access_count,
            last_accessed_at: row.last_accessed,
            embedding_query: None,
            embedding_location: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SemanticRow {
    id: String,
    original_query: String,
    location: String,
    #[serde(default)]
    query_embedding: Option<Vec<f32>>,
    #[serde(default)]
    location_embedding: Option<Vec<f32>>,
    cached_results: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    access_count: u64,
    #[serde(default = "Utc::now")]
    last_accessed: DateTime<Utc>,
    /// Only present on similarity search results
    #[serde(default, skip_serializing, rename = "combined_similarity", alias = "similarity")]
    similarity: Option<f32>,
}

impl From<&CacheEntry> for SemanticRow {
    fn from(e: &CacheEntry) -> Self {
        Self {
            id: e.key.clone(),
            original_query: e.query.clone(),
            location: e.location.clone(),
            query_embedding: e.embedding_query.clone(),
            location_embedding: e.embedding_location.clone(),
            cached_results: e.payload.clone(),
            created_at: e.created_at,
            expires_at: e.expires_at,
            access_count: e.access_count,
            last_accessed: e.last_accessed_at,
            similarity: None,
        }
    }
}

impl From<SemanticRow> for SimilarMatch {
    fn from(row: SemanticRow) -> Self {
        let similarity = row.similarity.unwrap_or(0.0);
        Self {
            entry: CacheEntry {
                key: row.id,
                query: row.original_query,
                location: row.location,
                payload: row.cached_results,
                created_at: row.created_at,
                expires_at: row.expires_at,
                access_count: row.access_count,
                last_accessed_at: row.last_accessed,
                embedding_query: row.query_embedding,
                embedding_location: row.location_embedding,
            },
            similarity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LocationRow {
    raw_input: String,
    normalized_location: String,
    confidence: f64,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    expires_at: DateTime<Utc>,
}

impl From<&LocationRecord> for LocationRow {
    fn from(r: &LocationRecord) -> Self {
        Self {
            raw_input: r.raw_input.clone(),
            normalized_location: r.normalized.clone(),
            confidence: r.confidence,
            latitude: r.coordinates.map(|c| c.lat),
            longitude: r.coordinates.map(|c| c.lng),
            expires_at: r.expires_at,
        }
    }
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        let coordinates = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };
        Self {
            raw_input: row.raw_input,
            normalized: row.normalized_location,
            confidence: row.confidence,
            coordinates,
            expires_at: row.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessRow {
    original_query: String,
    location: String,
    access_count: u64,
}

/// [`PersistentStore`] backed by Supabase's REST interface
pub struct SupabaseStore {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(client: HttpClient, settings: &SupabaseSettings) -> Self {
        Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("apikey", self.api_key.as_str())
            .bearer(&self.api_key)
            .header("Content-Type", "application/json")
    }

    fn table(&self, method: fn(String) -> HttpRequest, table: &str) -> HttpRequest {
        self.authorized(method(format!("{}/rest/v1/{}", self.base_url, table)))
    }

    fn rpc(&self, function: &str, args: serde_json::Value) -> HttpRequest {
        self.authorized(HttpRequest::post(format!(
            "{}/rest/v1/rpc/{}",
            self.base_url, function
        )))
        .json(args)
    }

    fn upsert(&self, table: &str, conflict: &str, row: serde_json::Value) -> HttpRequest {
        self.table(HttpRequest::post, table)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .param("on_conflict", conflict)
            .json(row)
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let url = request.url.clone();
        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()?;
        response.json()
    }

    async fn send_empty(&self, request: HttpRequest) -> Result<()> {
        self.client.execute(request).await?.error_for_status()?;
        Ok(())
    }

    /// Row count from a `count=exact` request
    async fn count(&self, table: &str) -> Result<u64> {
        let request = self
            .table(HttpRequest::get, table)
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header("Range", "0-0")
            .param("select", "*");

        let response = self.client.execute(request).await?.error_for_status()?;
        let total = response
            .headers
            .get("content-range")
            .and_then(|range| range.rsplit('/').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        Ok(total)
    }

    async fn has_popular(&self, column: &str, needle: &str, min_access: u64) -> Result<bool> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(false);
        }
        let request = self
            .table(HttpRequest::get, SEMANTIC_TABLE)
            .param("select", "access_count")
            .param(column, format!("ilike.*{}*", needle))
            .param("access_count", format!("gte.{}", min_access))
            .param("limit", "1");
        let rows: Vec<serde_json::Value> = self.send(request).await?;
        Ok(!rows.is_empty())
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl PersistentStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn get_exact(&self, key: &str) -> Result<Option<CacheEntry>> {
        let request = self
            .table(HttpRequest::get, EXACT_TABLE)
            .param("select", "*")
            .param("query_hash", format!("eq.{}", key))
            .param("expires_at", format!("gt.{}", timestamp(Utc::now())))
            .param("limit", "1");
        let rows: Vec<ExactRow> = self.send(request).await?;
        Ok(rows.into_iter().next().map(CacheEntry::from))
    }

    async fn upsert_exact(&self, entry: &CacheEntry) -> Result<()> {
        let mut row = serde_json::to_value(ExactRow::from(entry))?;
        // Keep the stored counter on conflict
        if let Some(obj) = row.as_object_mut() {
            obj.remove("access_count");
        }
        self.send_empty(self.upsert(EXACT_TABLE, "query_hash", row)).await
    }

    async fn find_similar(
        &self,
        query_embedding: &[f32],
        location_embedding: Option<&[f32]>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>> {
        let request = self.rpc(
            "find_similar_cached_query",
            json!({
                "input_query_embedding": query_embedding,
                "input_location_embedding": location_embedding,
                "similarity_threshold": threshold,
                "result_limit": limit,
            }),
        );
        let rows: Vec<SemanticRow> = self.send(request).await?;
        debug!(matches = rows.len(), "Semantic store search");
        Ok(rows.into_iter().map(SimilarMatch::from).collect())
    }

    async fn upsert_semantic(&self, entry: &CacheEntry) -> Result<()> {
        let mut row = serde_json::to_value(SemanticRow::from(entry))?;
        // Keep the stored counter on conflict
        if let Some(obj) = row.as_object_mut() {
            obj.remove("access_count");
        }
        self.send_empty(self.upsert(SEMANTIC_TABLE, "id", row)).await
    }

    async fn record_access(&self, key: &str) -> Result<()> {
        self.send_empty(self.rpc("update_cache_access", json!({ "cache_id": key })))
            .await
    }

    async fn is_popular(&self, query: &str, location: &str, min_access: u64) -> Result<bool> {
        if self.has_popular("original_query", query, min_access).await? {
            return Ok(true);
        }
        self.has_popular("location", location, min_access).await
    }

    async fn popular_queries(
        &self,
        exclude_query: &str,
        min_access: u64,
        limit: usize,
    ) -> Result<Vec<PopularQuery>> {
        let request = self
            .table(HttpRequest::get, SEMANTIC_TABLE)
            .param("select", "original_query,location,access_count")
            .param("original_query", format!("neq.{}", exclude_query))
            .param("access_count", format!("gte.{}", min_access))
            .param("order", "access_count.desc")
            .param("limit", limit.to_string());
        let rows: Vec<AccessRow> = self.send(request).await?;
        Ok(rows
            .into_iter()
            .map(|r| PopularQuery {
                query: r.original_query,
                location: r.location,
                access_count: r.access_count,
            })
            .collect())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let purged: serde_json::Value = self.send(self.rpc("clean_expired_cache", json!({}))).await?;
        Ok(purged.as_u64().unwrap_or(0))
    }

    async fn statistics(&self) -> Result<StoreStatistics> {
        let (exact, semantic, locations) = tokio::join!(
            self.count(EXACT_TABLE),
            self.count(SEMANTIC_TABLE),
            self.count(LOCATION_TABLE)
        );

        let mut stats = StoreStatistics {
            exact_entries: exact?,
            semantic_entries: semantic?,
            location_entries: locations?,
            ..Default::default()
        };

        // Extra figures are optional; the table counts above are authoritative
        match self
            .send::<serde_json::Value>(self.rpc("get_cache_statistics", json!({})))
            .await
        {
            Ok(extra) => {
                let extra = extra.as_array().and_then(|a| a.first()).unwrap_or(&extra);
                stats.expired_entries = extra["expired_entries"].as_u64().unwrap_or(0);
                stats.total_accesses = extra["total_accesses"].as_u64().unwrap_or(0);
            }
            Err(e) => debug!("Cache statistics function unavailable: {}", e),
        }

        Ok(stats)
    }

    async fn evict(&self, policy: &EvictionPolicy) -> Result<u64> {
        let request = self
            .table(HttpRequest::delete, SEMANTIC_TABLE)
            .header("Prefer", "return=representation")
            .param("select", "id")
            .param("access_count", format!("lt.{}", policy.max_access_count))
            .param("last_accessed", format!("lt.{}", timestamp(policy.stale_before)))
            .param("order", "last_accessed.asc")
            .param("limit", policy.limit.to_string());
        let deleted: Vec<serde_json::Value> = self.send(request).await?;
        Ok(deleted.len() as u64)
    }

    async fn get_location(&self, raw_input: &str) -> Result<Option<LocationRecord>> {
        let request = self
            .table(HttpRequest::get, LOCATION_TABLE)
            .param("select", "*")
            .param("raw_input", format!("eq.{}", raw_input))
            .param("expires_at", format!("gt.{}", timestamp(Utc::now())))
            .param("limit", "1");
        let rows: Vec<LocationRow> = self.send(request).await?;
        Ok(rows.into_iter().next().map(LocationRecord::from))
    }

    async fn upsert_location(&self, record: &LocationRecord) -> Result<()> {
        let row = serde_json::to_value(LocationRow::from(record))?;
        self.send_empty(self.upsert(LOCATION_TABLE, "raw_input", row)).await
    }
}
