//! API Module
//!
//! HTTP admin surface for operating the cache.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `GET /cache/:key` - Inspect a live entry
//! - `DELETE /cache/:key` - Delete a key
//! - `DELETE /cache` - Flush everything or one prefix

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
