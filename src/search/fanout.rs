//! Parallel provider fan-out

use crate::metrics::Metrics;
use crate::network::HttpClient;
use crate::providers::{ContentProvider, FetchParams, ProviderError, ProviderRegistry};
use crate::results::{Candidate, SourceStat, SourceStats};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Wait for every future and keep each outcome, in input order
pub async fn settle_all<I, F, T, E>(futures: I) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(futures).await
}

/// Candidates and per-provider statistics from one fan-out
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    /// Candidates in provider registration order
    pub candidates: Vec<Candidate>,
    pub source_stats: SourceStats,
    pub elapsed_ms: u64,
}

/// Queries every registered provider concurrently
pub struct FanOut {
    client: HttpClient,
    registry: Arc<ProviderRegistry>,
    metrics: Arc<Metrics>,
    default_timeout: Duration,
    max_timeout: Duration,
}

impl FanOut {
    pub fn new(client: HttpClient, registry: Arc<ProviderRegistry>, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            registry,
            metrics,
            default_timeout: Duration::from_secs(15),
            max_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn timeout_for(&self, name: &str) -> Duration {
        let seconds = self
            .registry
            .get_timeout(name, self.default_timeout.as_secs_f64())
            .min(self.max_timeout.as_secs_f64())
            .max(0.0);
        Duration::from_secs_f64(seconds)
    }

    /// Fetch from every provider. Never fails: a provider that errors or
    /// times out contributes no candidates and a failed stat.
    pub async fn gather(&self, location: &str, intent: &str) -> Gathered {
        let started = Instant::now();
        let params = FetchParams::new(location, intent);
        let providers = self.registry.all();

        info!(
            location = %location,
            intent = %intent,
            providers = providers.len(),
            "Fanning out to providers"
        );

        let outcomes = settle_all(providers.iter().map(|p| self.fetch_one(p.clone(), &params))).await;

        let mut gathered = Gathered::default();
        for (provider, outcome) in providers.iter().zip(outcomes) {
            let name = provider.name().to_string();
            match outcome {
                Ok((candidates, elapsed_ms)) => {
                    gathered
                        .source_stats
                        .insert(name, SourceStat::success(candidates.len(), elapsed_ms));
                    gathered.candidates.extend(candidates);
                }
                Err((error, elapsed_ms)) => {
                    gathered
                        .source_stats
                        .insert(name, SourceStat::failed(error.to_string(), elapsed_ms));
                }
            }
        }

        gathered.elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            candidates = gathered.candidates.len(),
            elapsed_ms = gathered.elapsed_ms,
            "Fan-out complete"
        );
        gathered
    }

    async fn fetch_one(
        &self,
        provider: Arc<dyn ContentProvider>,
        params: &FetchParams,
    ) -> Result<(Vec<Candidate>, u64), (ProviderError, u64)> {
        let name = provider.name().to_string();
        let limit = self.timeout_for(&name);
        let started = Instant::now();

        let result = match timeout(limit, provider.fetch(&self.client, params)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_response_time(&name, elapsed_ms);

        match result {
            Ok(candidates) => {
                self.metrics.record_success(&name);
                debug!(provider = %name, count = candidates.len(), elapsed_ms, "Provider answered");
                Ok((candidates, elapsed_ms))
            }
            Err(error) => {
                self.metrics.record_error(&name);
                warn!(provider = %name, elapsed_ms, "Provider failed: {}", error);
                Err((error, elapsed_ms))
            }
        }
    }
}
