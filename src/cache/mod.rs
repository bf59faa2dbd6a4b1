//! Cache Module
//!
//! In-process response cache with TTL expiration, oldest-inserted eviction,
//! namespaced keys and mutation-driven invalidation.

mod clock;
mod entry;
mod events;
mod handle;
pub mod invalidation;
pub mod keys;
mod order;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use events::{CacheEvent, EVENT_CHANNEL_CAPACITY};
pub use handle::{ResponseCache, WeakResponseCache};
pub use invalidation::{InvalidationPolicy, InvalidationReport, Mutation};
pub use keys::CacheKey;
pub use order::InsertionOrder;
pub use stats::{CacheStats, StatsCounters};
pub use store::{CacheStore, SetOutcome};
