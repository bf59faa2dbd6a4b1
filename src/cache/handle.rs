//! Shared Cache Handle
//!
//! Thread-safe front for [`CacheStore`]: one lock over the whole store,
//! lock-free statistics, an event channel and the sweep task lifecycle.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEvent, CacheKey, CacheStats, CacheStore, Clock, StatsCounters, SystemClock,
    EVENT_CHANNEL_CAPACITY,
};
use crate::config::Config;
use crate::tasks::spawn_sweep_task;

#[derive(Debug)]
struct Shared {
    store: RwLock<CacheStore>,
    stats: StatsCounters,
    events: broadcast::Sender<CacheEvent>,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

// == Response Cache ==
/// Cheaply clonable handle to one cache instance.
///
/// Construct it once at startup and hand clones to every call site.
/// Nothing here can fail: a call site may treat any problem as a miss and
/// fall through to the database.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    shared: Arc<Shared>,
}

/// Non-owning reference held by the sweep task.
#[derive(Debug, Clone)]
pub struct WeakResponseCache {
    shared: Weak<Shared>,
}

impl WeakResponseCache {
    pub fn upgrade(&self) -> Option<ResponseCache> {
        self.shared.upgrade().map(|shared| ResponseCache { shared })
    }
}

impl ResponseCache {
    // == Constructors ==
    /// Creates a cache from configuration without starting the sweep.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config.max_entries, config.default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache driven by `clock`.
    pub fn with_clock(max_entries: usize, default_ttl: u64, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(CacheStore::new(max_entries, default_ttl)),
                stats: StatsCounters::new(),
                events,
                clock,
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Creates a cache and starts its periodic sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(config: &Config) -> Self {
        let cache = Self::new(config);
        cache.start_sweeper(config.sweep_interval);
        cache
    }

    // == Lifecycle ==
    /// Starts the sweep task, replacing any running one.
    pub fn start_sweeper(&self, interval_secs: u64) {
        let handle = spawn_sweep_task(self.downgrade(), interval_secs);
        if let Some(previous) = self.shared.sweeper.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the sweep task. Cached data stays readable.
    pub fn shutdown(&self) {
        if let Some(handle) = self.shared.sweeper.lock().take() {
            handle.abort();
            info!("Cache sweep stopped");
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.shared
            .sweeper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn downgrade(&self) -> WeakResponseCache {
        WeakResponseCache {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn now_ms(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    fn publish(&self, event: CacheEvent) {
        // No subscribers is the normal case
        let _ = self.shared.events.send(event);
    }

    // == Get ==
    /// Returns a read-only snapshot of the live value for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let now = self.now_ms();
        let value = {
            let store = self.shared.store.read();
            store.get(key.as_str(), now).map(|entry| Arc::clone(&entry.value))
        };

        match value {
            Some(value) => {
                self.shared.stats.record_hit();
                Some(value)
            }
            None => {
                self.shared.stats.record_miss();
                None
            }
        }
    }

    /// Returns the live value for `key` decoded as `T`.
    ///
    /// A value that no longer decodes as `T` reads as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.get(key)?;
        match T::deserialize(&*value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key = %key, error = %err, "Cached value has unexpected shape");
                None
            }
        }
    }

    /// Returns the live value and its remaining TTL in seconds without
    /// counting a hit or miss.
    pub fn inspect(&self, key: &CacheKey) -> Option<(Arc<Value>, u64)> {
        let now = self.now_ms();
        let store = self.shared.store.read();
        store
            .get(key.as_str(), now)
            .map(|entry| (Arc::clone(&entry.value), entry.ttl_remaining(now)))
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl` seconds, or the default TTL.
    pub fn set(&self, key: &CacheKey, value: Value, ttl: Option<u64>) {
        let now = self.now_ms();
        let outcome = {
            let mut store = self.shared.store.write();
            store.set(key.as_str().to_string(), Arc::new(value), ttl, now)
        };

        debug!(key = %key, ttl = ?ttl, replaced = outcome.replaced, "Cache set");

        if !outcome.evicted.is_empty() {
            self.shared.stats.record_evictions(outcome.evicted.len() as u64);
            for victim in outcome.evicted {
                debug!(key = %victim, "Cache evicted entry at capacity");
                self.publish(CacheEvent::Evicted { key: victim });
            }
        }
    }

    /// Serializes `value` and stores it. A value that fails to serialize is
    /// not cached.
    pub fn set_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Option<u64>) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(err) => warn!(key = %key, error = %err, "Skipping cache set, value not serializable"),
        }
    }

    // == Delete ==
    /// Removes `key`. Returns whether anything was removed.
    pub fn delete(&self, key: &CacheKey) -> bool {
        let removed = self.shared.store.write().delete(key.as_str());
        if removed {
            debug!(key = %key, "Cache delete");
        }
        removed
    }

    /// Removes every key starting with `prefix`. Returns how many were removed.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let removed = self.shared.store.write().delete_prefix(prefix);
        debug!(prefix, removed = removed.len(), "Cache prefix delete");
        removed.len()
    }

    // == Flush ==
    /// Clears the whole cache in one step. Returns how many entries it held.
    pub fn flush(&self) -> usize {
        let removed = self.shared.store.write().flush();
        info!(removed, "Cache has been flushed");
        self.publish(CacheEvent::Flushed { removed });
        removed
    }

    // == Sweep ==
    /// Physically removes expired entries in a single pass.
    ///
    /// The write lock is held only for the pass; events go out afterwards.
    pub fn sweep_expired(&self) -> usize {
        let now = self.now_ms();
        let expired = self.shared.store.write().remove_expired(now);
        let count = expired.len();

        self.shared.stats.record_expirations(count as u64);
        for key in expired {
            debug!(key = %key, "Cache expired for key");
            self.publish(CacheEvent::Expired { key });
        }

        count
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        let total = self.len();
        self.shared.stats.snapshot(total)
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.shared.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_ttl(&self) -> u64 {
        self.shared.store.read().default_ttl()
    }

    pub fn max_entries(&self) -> usize {
        self.shared.store.read().max_entries()
    }

    /// Subscribes to expiry, eviction and flush notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.shared.events.subscribe()
    }
}
