//! Search context, phases and response models

use crate::query::ParsedQuery;
use crate::results::{Coordinates, ScoredResult, ScoringSummary, SourceStats};
use serde::{Deserialize, Serialize};

/// Per-request context the scoring engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchContext {
    pub raw_query: String,
    /// Normalized location
    pub location: String,
    pub intent: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub confidence: f64,
}

impl SearchContext {
    pub fn new(
        raw_query: impl Into<String>,
        location: impl Into<String>,
        intent: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            raw_query: raw_query.into(),
            location: location.into(),
            intent: intent.into(),
            coordinates: None,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// Orchestration phases, in the order a request moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CacheHit,
    Parse,
    ResolveLocation,
    FanOut,
    Score,
    Compose,
    CacheStore,
    Done,
}

/// Diagnostics attached to every response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDebug {
    pub request_id: String,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub data_source_ms: u64,
    #[serde(default)]
    pub parsed: Option<ParsedQuery>,
    #[serde(default)]
    pub normalized_location: Option<String>,
    #[serde(default)]
    pub source_stats: SourceStats,
    #[serde(default)]
    pub scoring_summary: Option<ScoringSummary>,
    /// `memory_hit`, `semantic_hit`, `exact_hit`, or absent for a live search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// Answer to one chat search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub user_intent: String,
    pub user_location: String,
    pub response: String,
    /// Primary results followed by nearby ones
    pub places: Vec<ScoredResult>,
    pub debug: SearchDebug,
}
