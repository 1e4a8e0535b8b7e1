//! Axum router configuration for all endpoints

use axum::{
  middleware::from_fn,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{embed, index, search, status};
use crate::server::middleware::request_context_middleware;
use crate::server::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/health", get(status::health))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    // Embedding endpoints
    .route("/embed", post(embed::embed))
    .route("/embed/batch", post(embed::embed_batch))
    // Indexing endpoints
    .route("/index", post(index::index))
    .route("/index/status", get(index::index_status))
    // Search
    .route("/search", post(search::search))
    .layer(from_fn(request_context_middleware))
    .with_state(state)
}
