//! API Handlers
//!
//! HTTP handlers for the cache admin endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::Config;
use crate::error::{Result, ServiceError};
use crate::models::{
    DeleteResponse, EntryResponse, FlushQuery, FlushResponse, HealthResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: ResponseCache,
}

impl AppState {
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }

    /// Creates the cache from configuration and starts its sweep.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ResponseCache::create(config))
    }
}

/// Handler for GET /cache/:key
///
/// Shows a live entry without affecting hit/miss statistics.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let cache_key = CacheKey::custom(key);
    let (value, ttl_remaining) = state
        .cache
        .inspect(&cache_key)
        .ok_or_else(|| ServiceError::NotFound(cache_key.to_string()))?;

    Ok(Json(EntryResponse {
        key: cache_key.into_string(),
        value: (*value).clone(),
        ttl_remaining,
    }))
}

/// Handler for DELETE /cache/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let cache_key = CacheKey::custom(key);
    let removed = state.cache.delete(&cache_key);

    Json(DeleteResponse::new(cache_key.into_string(), removed))
}

/// Handler for DELETE /cache
///
/// Flushes everything, or only the keys under `?prefix=`.
pub async fn flush_handler(
    State(state): State<AppState>,
    Query(query): Query<FlushQuery>,
) -> Result<Json<FlushResponse>> {
    match query.prefix {
        Some(prefix) if prefix.is_empty() => Err(ServiceError::InvalidRequest(
            "Prefix cannot be empty, omit it to flush everything".to_string(),
        )),
        Some(prefix) => {
            let removed = state.cache.delete_prefix(&prefix);
            Ok(Json(FlushResponse::prefix(&prefix, removed)))
        }
        None => Ok(Json(FlushResponse::flushed(state.cache.flush()))),
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
