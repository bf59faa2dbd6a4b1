//! Error types for the feed service and admin API
//!
//! The cache itself never fails; these cover the database, the caller and
//! the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Service Error Enum ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The database could not serve the request
    #[error("Database error: {0}")]
    Database(String),

    /// Requested record or cache key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller may not act on this record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the feed service.
pub type Result<T> = std::result::Result<T, ServiceError>;
