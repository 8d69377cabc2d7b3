//! Scoring engine
//!
//! Turns heterogeneous raw candidates into a bounded score, a deduplicated
//! ranking, and primary/nearby buckets.

mod engine;
mod geo;
mod keywords;

pub use engine::{app_fit, distance_score, relevance, ScoringEngine};
pub use geo::{haversine_miles, EARTH_RADIUS_MI};
