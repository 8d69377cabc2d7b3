//! Query parsing module
//!
//! Splits free-text chat input such as "weird stuff to do near Portland,
//! OR" into a location and an intent. The model-backed parser falls back to
//! the pattern-based one whenever it cannot produce both.

mod heuristic;
mod llm;

pub use heuristic::HeuristicParser;
pub use llm::LlmQueryParser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a query was parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMethod {
    Llm,
    Heuristic,
}

/// Location and intent extracted from chat input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Raw location text, empty when none was found
    pub location: String,
    pub intent: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub method: ParseMethod,
}

impl ParsedQuery {
    /// True when both a location and an intent were found
    pub fn is_complete(&self) -> bool {
        !self.location.trim().is_empty() && !self.intent.trim().is_empty()
    }
}

#[async_trait]
pub trait QueryParser: Send + Sync {
    async fn parse(&self, input: &str) -> ParsedQuery;
}
