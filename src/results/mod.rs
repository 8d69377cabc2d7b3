//! Result types shared by providers, scoring and the search orchestrator

mod types;

pub use types::*;
