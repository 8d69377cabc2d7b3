//! Underfoot: offbeat-place discovery over many content sources
//!
//! A chat query is parsed into a location and intent, fanned out to every
//! configured content provider, scored, categorized and summarized. Answers
//! are cached in a memory, semantic and exact tier so repeated and rephrased
//! questions skip the fan-out.

pub mod cache;
pub mod config;
pub mod embedding;
pub mod geocode;
pub mod metrics;
pub mod network;
pub mod openai;
pub mod providers;
pub mod query;
pub mod results;
pub mod scoring;
pub mod search;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Settings;
pub use providers::ContentProvider;
pub use search::{Search, SearchError, SearchResponse};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
