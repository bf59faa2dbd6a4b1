//! Feed Cache - A response cache for a social feed backend
//!
//! Caches read-model views with per-view TTLs, oldest-inserted eviction
//! and write-driven invalidation, plus a small admin HTTP surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use feed::{FeedService, MemoryRepository, Repository};
pub use tasks::spawn_sweep_task;
