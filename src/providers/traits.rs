//! Content provider traits and types

use crate::config::ProviderConfig;
use crate::network::{HttpClient, HttpRequest, HttpResponse};
use crate::results::{Candidate, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for one provider fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchParams {
    /// Normalized location
    pub location: String,
    /// Intent or theme
    pub intent: String,
}

impl FetchParams {
    pub fn new(location: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            intent: intent.into(),
        }
    }
}

/// Why a provider contributed nothing
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("provider error: {0}")]
    Other(String),
}

/// Main trait every content provider implements.
///
/// Providers describe a request and parse a response; the default [`fetch`]
/// runs the round trip through the shared client. Providers that are not
/// plain HTTP override `fetch` directly.
///
/// [`fetch`]: ContentProvider::fetch
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Kind of source, used by scoring
    fn kind(&self) -> ProviderKind;

    /// Default timeout in seconds
    fn timeout(&self) -> f64 {
        15.0
    }

    /// Build the HTTP request for a fetch
    fn request(&self, params: &FetchParams) -> anyhow::Result<HttpRequest>;

    /// Parse the HTTP response into candidates
    fn response(&self, response: HttpResponse, params: &FetchParams)
        -> anyhow::Result<Vec<Candidate>>;

    /// Fetch candidates for a location and intent
    async fn fetch(
        &self,
        client: &HttpClient,
        params: &FetchParams,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let request = self
            .request(params)
            .map_err(|e| ProviderError::Other(e.to_string()))?;

        let response = client
            .execute(request)
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(ProviderError::Http(response.status));
        }

        self.response(response, params)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Optional initialization from configuration
    fn init(&mut self, _config: &ProviderConfig) -> anyhow::Result<()> {
        Ok(())
    }

    /// Optional validation of configuration
    fn validate(&self, _config: &ProviderConfig) -> anyhow::Result<()> {
        Ok(())
    }
}
