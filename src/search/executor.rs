//! Search orchestration

use super::compose::{LlmComposer, ResponseComposer, TemplateComposer};
use super::error::SearchError;
use super::fanout::FanOut;
use super::models::{Phase, SearchContext, SearchDebug, SearchResponse};
use crate::cache::{
    CacheAnalytics, CacheHierarchy, CacheLookup, CleanupReport, InMemoryStore, PersistentStore,
    SupabaseStore,
};
use crate::config::Settings;
use crate::embedding::{DisabledEmbedder, EmbeddingProvider, OpenAiEmbedder};
use crate::geocode::{Geoapify, Geocoder, LocationResolver, NoGeocoder};
use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::openai::OpenAiClient;
use crate::providers::ProviderLoader;
use crate::query::{HeuristicParser, LlmQueryParser, QueryParser};
use crate::scoring::ScoringEngine;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Location key used for chat-level cache entries; the location is not
/// known until the input has been parsed
const CHAT_CACHE_LOCATION: &str = "";

/// Turns chat input into ranked places, serving repeats from the cache
pub struct Search {
    cache: Arc<CacheHierarchy>,
    parser: Arc<dyn QueryParser>,
    resolver: LocationResolver,
    fanout: FanOut,
    scoring: ScoringEngine,
    composer: Arc<dyn ResponseComposer>,
    metrics: Arc<Metrics>,
}

impl Search {
    pub fn new(
        cache: Arc<CacheHierarchy>,
        parser: Arc<dyn QueryParser>,
        resolver: LocationResolver,
        fanout: FanOut,
        scoring: ScoringEngine,
        composer: Arc<dyn ResponseComposer>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cache,
            parser,
            resolver,
            fanout,
            scoring,
            composer,
            metrics,
        }
    }

    /// Wire every collaborator from settings.
    ///
    /// Missing credentials degrade instead of failing: no OpenAI key means
    /// heuristic parsing, template replies and no semantic tier; no Supabase
    /// means an in-process store; no Geoapify key means raw locations.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = HttpClient::with_settings(&settings.outgoing)?;
        let metrics = Arc::new(Metrics::new());

        let store: Arc<dyn PersistentStore> = match &settings.supabase {
            Some(supabase) => Arc::new(SupabaseStore::new(client.clone(), supabase)),
            None => {
                warn!("Supabase not configured, using in-process cache store");
                Arc::new(InMemoryStore::new())
            }
        };

        let openai = settings
            .openai
            .as_ref()
            .filter(|o| !o.api_key.is_empty())
            .map(|o| OpenAiClient::new(client.clone(), o.clone()));

        let embedder: Arc<dyn EmbeddingProvider>;
        let parser: Arc<dyn QueryParser>;
        let composer: Arc<dyn ResponseComposer>;
        match &openai {
            Some(openai) => {
                embedder = Arc::new(OpenAiEmbedder::new(openai.clone()));
                parser = Arc::new(LlmQueryParser::new(openai.clone(), settings.query.clone()));
                composer = if openai.settings().compose_responses {
                    Arc::new(LlmComposer::new(openai.clone()))
                } else {
                    Arc::new(TemplateComposer)
                };
            }
            None => {
                warn!("OpenAI not configured, using heuristic parsing and template replies");
                embedder = Arc::new(DisabledEmbedder);
                parser = Arc::new(HeuristicParser::new(settings.query.clone()));
                composer = Arc::new(TemplateComposer);
            }
        }

        let geocoder: Arc<dyn Geocoder> = match &settings.geoapify {
            Some(geo) if !geo.api_key.is_empty() => Arc::new(Geoapify::new(client.clone(), geo.clone())),
            _ => Arc::new(NoGeocoder),
        };

        let registry = Arc::new(ProviderLoader::load(settings)?);
        let cache = Arc::new(CacheHierarchy::new(
            store.clone(),
            embedder,
            metrics.clone(),
            settings.cache.clone(),
        ));
        let resolver = LocationResolver::new(geocoder, store, settings.cache.location_ttl());
        let fanout = FanOut::new(client, registry, metrics.clone())
            .with_timeout(settings.outgoing.default_timeout())
            .with_max_timeout(settings.outgoing.max_timeout());

        Ok(Self::new(
            cache,
            parser,
            resolver,
            fanout,
            ScoringEngine::new(settings.scoring.clone()),
            composer,
            metrics,
        ))
    }

    pub fn cache(&self) -> &Arc<CacheHierarchy> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Names of the providers every live search fans out to
    pub fn provider_names(&self) -> Vec<String> {
        self.fanout.registry().names().into_iter().map(str::to_string).collect()
    }

    /// Answer one chat input. `force` skips the cache lookup; the fresh
    /// result is still stored.
    pub async fn search(&self, chat_input: &str, force: bool) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let request_id = format!("search_{}", Uuid::new_v4());

        let input = chat_input.trim();
        if input.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        self.metrics.inc_search();
        info!(request_id = %request_id, input = %truncate(input, 100), force, "Search started");

        if !force {
            if let Some(response) = self.cached(input, &request_id, started).await {
                return Ok(response);
            }
        }

        let mut phases = vec![Phase::Parse];
        let parsed = self.parser.parse(input).await;
        if parsed.location.trim().is_empty() {
            return Err(SearchError::Unparseable("location"));
        }
        if parsed.intent.trim().is_empty() {
            return Err(SearchError::Unparseable("intent"));
        }

        phases.push(Phase::ResolveLocation);
        let resolved = self.resolver.resolve(&parsed.location).await;
        let mut context = SearchContext::new(input, &resolved.normalized, &parsed.intent, parsed.confidence);
        if let Some(coordinates) = resolved.coordinates {
            context = context.with_coordinates(coordinates);
        }

        phases.push(Phase::FanOut);
        let gathered = self.fanout.gather(&context.location, &context.intent).await;

        phases.push(Phase::Score);
        let ranked = self.scoring.rank_and_filter(gathered.candidates, &context);
        let summary = self.scoring.summarize(&ranked);
        let categorized = self.scoring.categorize(ranked);

        phases.push(Phase::Compose);
        let text = self
            .composer
            .compose(&context.intent, &context.location, &categorized, &summary)
            .await;

        phases.push(Phase::CacheStore);
        phases.push(Phase::Done);

        let mut response = SearchResponse {
            user_intent: context.intent.clone(),
            user_location: context.location.clone(),
            response: text,
            places: categorized.into_places(),
            debug: SearchDebug {
                request_id: request_id.clone(),
                execution_time_ms: started.elapsed().as_millis() as u64,
                data_source_ms: gathered.elapsed_ms,
                parsed: Some(parsed),
                normalized_location: Some(resolved.normalized),
                source_stats: gathered.source_stats,
                scoring_summary: Some(summary),
                cache: None,
                similarity: None,
                phases,
            },
        };

        let payload = serde_json::to_value(&response).map_err(anyhow::Error::from)?;
        let stored = self.cache.store(input, CHAT_CACHE_LOCATION, &payload, None).await;

        response.debug.execution_time_ms = started.elapsed().as_millis() as u64;
        info!(
            request_id = %request_id,
            places = response.places.len(),
            stored,
            elapsed_ms = response.debug.execution_time_ms,
            "Search complete"
        );
        Ok(response)
    }

    /// Cached response annotated for this request, if any tier has one
    async fn cached(&self, input: &str, request_id: &str, started: Instant) -> Option<SearchResponse> {
        let CacheLookup::Hit {
            source,
            payload,
            similarity,
        } = self.cache.lookup(input, CHAT_CACHE_LOCATION).await
        else {
            return None;
        };

        let mut response: SearchResponse = match serde_json::from_value(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(source = %source, "Cached payload is not a search response, ignoring: {}", e);
                return None;
            }
        };

        response.debug.request_id = request_id.to_string();
        response.debug.cache = Some(format!("{}_hit", source));
        response.debug.similarity = similarity;
        response.debug.phases = vec![Phase::CacheHit, Phase::Done];
        response.debug.execution_time_ms = started.elapsed().as_millis() as u64;

        info!(request_id = %request_id, source = %source, "Served from cache");
        Some(response)
    }

    pub async fn cache_analytics(&self) -> CacheAnalytics {
        self.cache.analytics().await
    }

    pub async fn cache_cleanup(&self) -> CleanupReport {
        self.cache.cleanup().await
    }

    pub fn reset_cache_metrics(&self) {
        self.cache.reset_metrics();
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheSettings, ProviderConfig, QuerySettings};
    use crate::providers::{ContentProvider, ProviderError, ProviderRegistry};
    use crate::testing::{candidate, CountingEmbedder, FailingStore, StaticProvider};
    use serde_json::json;
    use std::time::Duration;

    struct Harness {
        search: Search,
        providers: Vec<Arc<StaticProvider>>,
    }

    impl Harness {
        fn provider_calls(&self) -> usize {
            self.providers.iter().map(|p| p.calls()).sum()
        }
    }

    fn harness(providers: Vec<StaticProvider>) -> Harness {
        harness_with_store(providers, Arc::new(InMemoryStore::new()))
    }

    fn harness_with_store(providers: Vec<StaticProvider>, store: Arc<dyn PersistentStore>) -> Harness {
        let providers: Vec<Arc<StaticProvider>> = providers.into_iter().map(Arc::new).collect();
        let mut registry = ProviderRegistry::new();
        for provider in &providers {
            registry.register(
                provider.clone(),
                ProviderConfig {
                    name: provider.name().to_string(),
                    ..Default::default()
                },
            );
        }

        let metrics = Arc::new(Metrics::new());
        let settings = CacheSettings {
            warmup_delay_ms: 0,
            warmup_step_ms: 0,
            ..Default::default()
        };
        let cache = Arc::new(CacheHierarchy::new(
            store.clone(),
            Arc::new(CountingEmbedder::default()),
            metrics.clone(),
            settings,
        ));
        let resolver = LocationResolver::new(Arc::new(NoGeocoder), store, Duration::from_secs(3600));
        let fanout = FanOut::new(HttpClient::new().unwrap(), Arc::new(registry), metrics.clone());

        Harness {
            search: Search::new(
                cache,
                Arc::new(HeuristicParser::new(QuerySettings::default())),
                resolver,
                fanout,
                ScoringEngine::default(),
                Arc::new(TemplateComposer),
                metrics,
            ),
            providers,
        }
    }

    fn standard() -> Harness {
        harness(vec![
            StaticProvider::returning(
                "web",
                vec![
                    candidate("web", "mural-alley", 2.0).with_description("hidden gems of Pikeville street art"),
                    candidate("web", "old-depot", 20.0),
                ],
            ),
            StaticProvider::failing("events", ProviderError::Timeout),
            StaticProvider::returning("social", vec![candidate("social", "creek-trail", 4.0)]),
        ])
    }

    const QUERY: &str = "hidden gems in Pikeville KY";

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let h = standard();
        let err = h.search.search("   ", false).await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(err.is_client_error());
        assert_eq!(h.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_location_is_rejected() {
        let h = standard();
        let err = h.search.search("something fun", false).await.unwrap_err();
        assert!(matches!(err, SearchError::Unparseable("location")));
        assert_eq!(h.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_live_search() {
        let h = standard();
        let response = h.search.search(QUERY, false).await.unwrap();

        assert_eq!(response.user_location, "Pikeville KY");
        assert_eq!(response.user_intent, "hidden gems");
        assert_eq!(response.places.len(), 3);
        assert_eq!(response.places[0].candidate.name, "mural-alley");
        assert!(response.debug.cache.is_none());
        assert_eq!(
            response.debug.phases,
            vec![
                Phase::Parse,
                Phase::ResolveLocation,
                Phase::FanOut,
                Phase::Score,
                Phase::Compose,
                Phase::CacheStore,
                Phase::Done
            ]
        );
        assert_eq!(response.debug.source_stats.len(), 3);
        assert_eq!(response.debug.scoring_summary.as_ref().unwrap().total_results, 3);
        assert!(response.debug.request_id.starts_with("search_"));
    }

    #[tokio::test]
    async fn test_repeat_is_served_from_memory() {
        let h = standard();
        let first = h.search.search(QUERY, false).await.unwrap();
        let calls = h.provider_calls();

        let second = h.search.search(QUERY, false).await.unwrap();
        assert_eq!(h.provider_calls(), calls);
        assert_eq!(second.debug.cache.as_deref(), Some("memory_hit"));
        assert_eq!(second.debug.phases, vec![Phase::CacheHit, Phase::Done]);
        assert_ne!(second.debug.request_id, first.debug.request_id);
        assert_eq!(second.places, first.places);
    }

    #[tokio::test]
    async fn test_rephrased_query_hits_semantic_tier() {
        let h = standard();
        h.search.search(QUERY, false).await.unwrap();
        let calls = h.provider_calls();

        let response = h.search.search("Hidden gems in Pikeville, KY?", false).await.unwrap();
        assert_eq!(h.provider_calls(), calls);
        assert_eq!(response.debug.cache.as_deref(), Some("semantic_hit"));
        assert!(response.debug.similarity.unwrap() >= 0.85);
    }

    #[tokio::test]
    async fn test_force_skips_lookup_but_stores() {
        let h = standard();
        h.search.search(QUERY, false).await.unwrap();
        let calls = h.provider_calls();

        let forced = h.search.search(QUERY, true).await.unwrap();
        assert!(h.provider_calls() > calls);
        assert!(forced.debug.cache.is_none());

        let analytics = h.search.cache_analytics().await;
        assert_eq!(analytics.store.unwrap().exact_entries, 1);
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_a_miss() {
        let h = standard();
        h.search.cache().store(QUERY, "", &json!({"bogus": true}), None).await;

        let response = h.search.search(QUERY, false).await.unwrap();
        assert!(response.debug.cache.is_none());
        assert!(h.provider_calls() > 0);
    }

    #[tokio::test]
    async fn test_total_fanout_failure() {
        let h = harness(vec![
            StaticProvider::failing("a", ProviderError::Http(500)),
            StaticProvider::failing("b", ProviderError::Timeout),
        ]);

        let response = h.search.search(QUERY, false).await.unwrap();
        assert!(response.places.is_empty());
        assert!(response.response.starts_with("Nothing turned up"));
        assert_eq!(response.debug.source_stats.len(), 2);
    }

    #[tokio::test]
    async fn test_store_outage_still_answers() {
        let h = harness_with_store(
            vec![StaticProvider::returning(
                "web",
                vec![candidate("web", "mural-alley", 2.0), candidate("web", "creek-trail", 4.0)],
            )],
            Arc::new(FailingStore),
        );

        let response = h.search.search(QUERY, false).await.unwrap();
        assert_eq!(response.places.len(), 2);
        assert!(!response.response.is_empty());
        assert!(response.debug.cache.is_none());
        assert_eq!(response.debug.phases.last(), Some(&Phase::Done));

        // The memory tier still holds the answer
        let again = h.search.search(QUERY, false).await.unwrap();
        assert_eq!(again.debug.cache.as_deref(), Some("memory_hit"));
        assert_eq!(again.places, response.places);

        assert!(!h.search.cache_cleanup().await.success);
    }

    #[tokio::test]
    async fn test_cache_admin_operations() {
        let h = standard();
        h.search.search(QUERY, false).await.unwrap();
        h.search.search(QUERY, false).await.unwrap();

        let analytics = h.search.cache_analytics().await;
        assert_eq!(analytics.counters.total_lookups, 2);
        assert_eq!(analytics.counters.memory_hits, 1);

        h.search.reset_cache_metrics();
        assert_eq!(h.search.cache_analytics().await.counters.total_lookups, 0);

        assert!(h.search.cache_cleanup().await.success);
    }
}
