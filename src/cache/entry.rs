//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::Arc;

use serde_json::Value;

// == Cache Entry ==
/// A single cached payload with its expiration metadata.
///
/// The payload sits behind an `Arc` so readers get a cheap snapshot that can
/// never write back into the store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Arc<Value>,
    /// Insertion timestamp (Unix milliseconds), diagnostics only
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Insertion sequence number, used for eviction order
    pub sequence: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl_seconds` after `now_ms`.
    pub fn new(value: Arc<Value>, now_ms: u64, ttl_seconds: u64, sequence: u64) -> Self {
        Self {
            value,
            inserted_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_seconds.saturating_mul(1000)),
            sequence,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time reaches the expiration
    /// time, so a TTL of `n` seconds is readable for strictly less than `n`
    /// seconds.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Returns remaining TTL in whole seconds, 0 once expired.
    pub fn ttl_remaining(&self, now_ms: u64) -> u64 {
        self.ttl_remaining_ms(now_ms) / 1000
    }
}
