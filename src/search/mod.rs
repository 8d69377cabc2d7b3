//! Search orchestration module
//!
//! Turns chat input into a location and intent, fans out to every content
//! provider, scores and categorizes what comes back, and caches the answer.

mod compose;
mod error;
mod executor;
mod fanout;
mod models;

pub use compose::{LlmComposer, ResponseComposer, TemplateComposer};
pub use error::SearchError;
pub use executor::Search;
pub use fanout::{settle_all, FanOut, Gathered};
pub use models::*;
