//! Hand-written fakes shared by unit tests

use crate::cache::{
    CacheEntry, EvictionPolicy, LocationRecord, PersistentStore, PopularQuery, SimilarMatch,
    StoreStatistics,
};
use crate::embedding::EmbeddingProvider;
use crate::network::{HttpClient, HttpRequest, HttpResponse};
use crate::providers::{ContentProvider, FetchParams, ProviderError};
use crate::results::{Candidate, ProviderKind};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DIMENSIONS: usize = 16;

/// Deterministic bag-of-words embedder that counts its calls
#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; DIMENSIONS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let slot = word.bytes().map(|b| b as usize).sum::<usize>() % DIMENSIONS;
            vector[slot] += 1.0;
        }
        Ok(vector)
    }
}

/// Embedder whose every call fails
#[derive(Default)]
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("embedding backend unavailable")
    }
}

/// Embedder that never answers
#[derive(Default)]
pub struct HangingEmbedder;

#[async_trait]
impl EmbeddingProvider for HangingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        bail!("embedding never finished")
    }
}

/// Store whose every call fails
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl PersistentStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get_exact(&self, _key: &str) -> Result<Option<CacheEntry>> {
        bail!("store down")
    }

    async fn upsert_exact(&self, _entry: &CacheEntry) -> Result<()> {
        bail!("store down")
    }

    async fn find_similar(
        &self,
        _query_embedding: &[f32],
        _location_embedding: Option<&[f32]>,
        _threshold: f32,
        _limit: usize,
    ) -> Result<Vec<SimilarMatch>> {
        bail!("store down")
    }

    async fn upsert_semantic(&self, _entry: &CacheEntry) -> Result<()> {
        bail!("store down")
    }

    async fn record_access(&self, _key: &str) -> Result<()> {
        bail!("store down")
    }

    async fn is_popular(&self, _query: &str, _location: &str, _min_access: u64) -> Result<bool> {
        bail!("store down")
    }

    async fn popular_queries(
        &self,
        _exclude_query: &str,
        _min_access: u64,
        _limit: usize,
    ) -> Result<Vec<PopularQuery>> {
        bail!("store down")
    }

    async fn purge_expired(&self) -> Result<u64> {
        bail!("store down")
    }

    async fn statistics(&self) -> Result<StoreStatistics> {
        bail!("store down")
    }

    async fn evict(&self, _policy: &EvictionPolicy) -> Result<u64> {
        bail!("store down")
    }

    async fn get_location(&self, _raw_input: &str) -> Result<Option<LocationRecord>> {
        bail!("store down")
    }

    async fn upsert_location(&self, _record: &LocationRecord) -> Result<()> {
        bail!("store down")
    }
}

enum Behavior {
    Return(Vec<Candidate>),
    Fail(ProviderError),
    Hang,
}

/// Provider returning canned candidates, an error, or never answering
pub struct StaticProvider {
    name: String,
    kind: ProviderKind,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn returning(name: &str, candidates: Vec<Candidate>) -> Self {
        Self::with(name, Behavior::Return(candidates))
    }

    pub fn failing(name: &str, error: ProviderError) -> Self {
        Self::with(name, Behavior::Fail(error))
    }

    pub fn hanging(name: &str) -> Self {
        Self::with(name, Behavior::Hang)
    }

    fn with(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            kind: ProviderKind::WebSearch,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn timeout(&self) -> f64 {
        0.2
    }

    fn request(&self, _params: &FetchParams) -> Result<HttpRequest> {
        bail!("static provider builds no requests")
    }

    fn response(&self, _response: HttpResponse, _params: &FetchParams) -> Result<Vec<Candidate>> {
        bail!("static provider parses no responses")
    }

    async fn fetch(
        &self,
        _client: &HttpClient,
        _params: &FetchParams,
    ) -> Result<Vec<Candidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Return(candidates) => Ok(candidates.clone()),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Candidate with a distance, named after its URL slug
pub fn candidate(source: &str, slug: &str, miles: f64) -> Candidate {
    Candidate::new(
        slug,
        format!("https://{}.test/{}", source, slug),
        source,
        ProviderKind::WebSearch,
    )
    .with_distance(miles)
}
