//! Candidate and scored-result type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Kind of content provider a candidate came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    WebSearch,
    SocialFeed,
    Events,
}

/// Cheap text signals extracted by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFeatures {
    pub recency_hours: u64,
    pub underground_keyword_hits: u32,
    /// 1 when the domain is not a large aggregator
    pub indie_domain: u8,
    pub image_present: u8,
    pub est_reading_minutes: u32,
}

/// One raw result contributed by a single content provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub description: String,
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub distance_mi: Option<f64>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub features: CandidateFeatures,
    pub source_id: String,
    pub source_name: String,
    #[serde(default)]
    pub source_kind: ProviderKind,
    pub fetched_at: DateTime<Utc>,
}

impl Candidate {
    /// Create a candidate with empty signals
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        source_name: impl Into<String>,
        source_kind: ProviderKind,
    ) -> Self {
        let url = url.into();
        let source_name = source_name.into();
        Self {
            name: name.into(),
            description: String::new(),
            domain: crate::providers::extract_domain(&url),
            source_id: format!("{}_{}", source_name, url),
            url,
            distance_mi: None,
            coordinates: None,
            features: CandidateFeatures::default(),
            source_name,
            source_kind,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_distance(mut self, miles: f64) -> Self {
        self.distance_mi = Some(miles);
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_features(mut self, features: CandidateFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// Identity used for deduplication: the URL, case-insensitively
    pub fn dedup_key(&self) -> String {
        self.url.to_lowercase()
    }
}

/// Sub-scores that make up a result's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub relevance: f64,
    pub distance: f64,
    pub app_fit: f64,
}

/// A candidate with its bounded score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Weighted score in [0, 1]
    pub score: f64,
    /// Score on a five-star scale, one decimal
    pub star_rating: f64,
    pub score_factors: ScoreFactors,
}

/// Results split into headline and farther-out buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedResults {
    pub primary: Vec<ScoredResult>,
    pub nearby: Vec<ScoredResult>,
}

impl CategorizedResults {
    pub fn len(&self) -> usize {
        self.primary.len() + self.nearby.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.nearby.is_empty()
    }

    /// Primary followed by nearby, in categorized order
    pub fn into_places(self) -> Vec<ScoredResult> {
        let mut places = self.primary;
        places.extend(self.nearby);
        places
    }
}

/// Score bands used by the scoring summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

/// Aggregate view over a scored result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringSummary {
    pub total_results: usize,
    pub average_score: f64,
    pub score_distribution: ScoreDistribution,
    pub average_factors: ScoreFactors,
}

/// Outcome of one provider call during fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Failed,
}

/// Per-provider statistics for one fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStat {
    pub count: usize,
    pub status: SourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl SourceStat {
    pub fn success(count: usize, elapsed_ms: u64) -> Self {
        Self {
            count,
            status: SourceStatus::Success,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            count: 0,
            status: SourceStatus::Failed,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// Per-provider statistics keyed by provider name
pub type SourceStats = BTreeMap<String, SourceStat>;
