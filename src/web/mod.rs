//! Web server module
//!
//! JSON API over the search orchestrator plus the cache admin routes.

mod handlers;
mod routes;
mod state;

pub use handlers::{ApiError, SearchRequest};
pub use routes::create_router;
pub use state::AppState;
