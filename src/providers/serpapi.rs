//! SerpAPI web search provider

use super::features::{extract_domain, extract_features};
use super::traits::*;
use crate::config::ProviderConfig;
use crate::network::{HttpRequest, HttpResponse};
use crate::results::{Candidate, ProviderKind};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Web search through SerpAPI's Google engine
pub struct SerpApi {
    base_url: String,
    api_key: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    position: Option<u32>,
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    thumbnail: Option<String>,
    date: Option<String>,
}

impl SerpApi {
    pub fn new() -> Self {
        Self {
            base_url: "https://serpapi.com/search".to_string(),
            api_key: String::new(),
            limit: 10,
        }
    }

    fn search_query(params: &FetchParams) -> String {
        format!("hidden gems {} {}", params.location, params.intent)
            .trim()
            .to_string()
    }

    fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%b %d, %Y")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            })
    }

    fn to_candidate(&self, result: OrganicResult) -> Candidate {
        let published = result.date.as_deref().and_then(Self::parse_date);
        let features = extract_features(
            &result.link,
            &result.title,
            &result.snippet,
            published,
            result.thumbnail.is_some(),
        );
        let source_id = format!(
            "serp_{}_{}",
            result.position.unwrap_or_default(),
            extract_domain(&result.link)
        );

        Candidate::new(result.title, result.link, self.name(), self.kind())
            .with_description(result.snippet)
            .with_features(features)
            .with_source_id(source_id)
    }
}

impl Default for SerpApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentProvider for SerpApi {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::WebSearch
    }

    fn request(&self, params: &FetchParams) -> Result<HttpRequest> {
        Ok(HttpRequest::get(&self.base_url)
            .param("engine", "google")
            .param("q", Self::search_query(params))
            .param("location", &params.location)
            .param("api_key", &self.api_key)
            .param("num", self.limit.to_string())
            .param("hl", "en")
            .param("gl", "us")
            .param("safe", "active"))
    }

    fn response(&self, response: HttpResponse, _params: &FetchParams) -> Result<Vec<Candidate>> {
        let body: SerpResponse = response.json()?;
        if let Some(error) = body.error {
            return Err(anyhow::anyhow!("SerpAPI error: {}", error));
        }

        Ok(body
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .map(|r| self.to_candidate(r))
            .collect())
    }

    fn init(&mut self, config: &ProviderConfig) -> Result<()> {
        if let Some(ref base_url) = config.base_url {
            self.base_url = base_url.clone();
        }
        self.api_key = config.api_key.clone().unwrap_or_default();
        self.limit = config.limit;
        Ok(())
    }

    fn validate(&self, _config: &ProviderConfig) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("serpapi requires an api_key (SERPAPI_KEY)"));
        }
        Ok(())
    }
}
