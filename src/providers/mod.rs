//! Content provider module
//!
//! Defines the ContentProvider trait and a registry of the web-search,
//! social-feed and events providers the fan-out queries.

mod features;
mod loader;
mod registry;
mod traits;

pub mod eventbrite;
pub mod reddit;
pub mod serpapi;

pub use features::{
    count_underground_keywords, estimate_reading_minutes, extract_domain, extract_features,
    is_indie_domain,
};
pub use loader::ProviderLoader;
pub use registry::ProviderRegistry;
pub use traits::*;
