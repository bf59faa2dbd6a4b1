//! Cache Events
//!
//! Notifications published when entries leave the cache other than by an
//! explicit delete. Consumers use them for logging and metrics only; lazy
//! expiration on read already keeps lookups correct without them.

use serde::Serialize;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    /// The sweep reclaimed an expired entry
    Expired { key: String },
    /// An entry was evicted to stay within capacity
    Evicted { key: String },
    /// The whole cache was cleared
    Flushed { removed: usize },
}
