//! API Routes
//!
//! Configures the Axum router with the cache admin endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, flush_handler, get_entry_handler, health_handler, stats_handler, AppState,
};

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache statistics
/// - `GET /cache/:key` - Inspect a live entry
/// - `DELETE /cache/:key` - Delete one key
/// - `DELETE /cache` - Flush, or `?prefix=` to remove one namespace
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(flush_handler))
        .route("/cache/:key", get(get_entry_handler).delete(delete_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
