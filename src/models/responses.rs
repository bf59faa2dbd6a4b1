//! Response shapes for feed views and the admin API

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Warning attached to a listing served from a broader cached view because
/// the database failed.
pub const FALLBACK_WARNING: &str = "Served from cache due to error";

/// Result of a read-through view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResponse<T> {
    pub success: bool,
    pub data: T,
    /// True when `data` came from the cache
    pub from_cache: bool,
    /// Set when `data` is a degraded fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ViewResponse<T> {
    pub fn fresh(data: T) -> Self {
        Self {
            success: true,
            data,
            from_cache: false,
            warning: None,
        }
    }

    pub fn cached(data: T) -> Self {
        Self {
            success: true,
            data,
            from_cache: true,
            warning: None,
        }
    }

    pub fn degraded(data: T) -> Self {
        Self {
            success: true,
            data,
            from_cache: true,
            warning: Some(FALLBACK_WARNING.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewResponse<U> {
        ViewResponse {
            success: self.success,
            data: f(self.data),
            from_cache: self.from_cache,
            warning: self.warning,
        }
    }
}

/// Like state after a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: usize,
}

/// Follow state after a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    pub following: bool,
    pub follower_count: usize,
}

/// Bookmark state after a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkOutcome {
    pub bookmarked: bool,
}

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: Value,
    /// Seconds until expiry
    pub ttl_remaining: u64,
}

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
    /// False when the key was already absent
    pub removed: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
            removed,
        }
    }
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub message: String,
    pub removed: usize,
}

impl FlushResponse {
    pub fn flushed(removed: usize) -> Self {
        Self {
            message: "Cache flushed".to_string(),
            removed,
        }
    }

    pub fn prefix(prefix: &str, removed: usize) -> Self {
        Self {
            message: format!("Keys under '{}' removed", prefix),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
