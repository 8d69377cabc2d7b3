//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/search", post(handlers::search))
        .route("/health", get(handlers::health));

    if state.admin_routes() {
        router = router
            .route("/api/cache/analytics", get(handlers::cache_analytics))
            .route("/api/cache/cleanup", post(handlers::cache_cleanup))
            .route("/api/cache/reset-metrics", post(handlers::cache_reset_metrics));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
