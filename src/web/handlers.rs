//! HTTP request handlers

use super::state::AppState;
use crate::search::SearchError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

/// Body of `POST /api/search`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub chat_input: Option<String>,
    /// Skip the cache lookup
    #[serde(default)]
    pub force: bool,
}

/// Error body returned by every API route
pub struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(error: SearchError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Search failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Chat search handler
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Response, ApiError> {
    let input = request.chat_input.unwrap_or_default();
    let response = state.search.search(&input, request.force).await?;
    Ok(Json(response).into_response())
}

/// Cache analytics handler
pub async fn cache_analytics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.search.cache_analytics().await)
}

/// Manual cleanup sweep
pub async fn cache_cleanup(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.maintenance.trigger_cleanup().await;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}

/// Zero the in-process cache counters
pub async fn cache_reset_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.search.reset_cache_metrics();
    Json(json!({ "success": true }))
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.search.metrics();
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "total_searches": metrics.get_total_searches(),
        "memory_entries": state.search.cache().memory_size(),
        "providers": metrics.get_provider_stats(),
    }))
}
