//! Cache Store Module
//!
//! Single-threaded cache engine: HashMap storage with insertion-order
//! eviction and TTL expiration. Thread safety and statistics are layered on
//! top by [`ResponseCache`](crate::cache::ResponseCache).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheEntry, InsertionOrder};

// == Set Outcome ==
/// What a `set` had to do to make room and whether it overwrote a key.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SetOutcome {
    /// Keys evicted to stay within capacity, oldest first
    pub evicted: Vec<String>,
    /// True when an existing entry (live or expired) was replaced
    pub replaced: bool,
}

// == Cache Store ==
/// Cache storage with oldest-inserted eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Eviction order
    order: InsertionOrder,
    /// Maximum number of entries allowed (at least 1)
    max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    default_ttl: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// A capacity of 0 is treated as 1 so every insert can succeed.
    pub fn new(max_entries: usize, default_ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            max_entries: max_entries.max(1),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value under `key`, expiring `ttl` seconds after `now_ms`.
    ///
    /// An existing entry is overwritten and its expiration reset. Inserting a
    /// new key at capacity first evicts the oldest-inserted entries.
    pub fn set(
        &mut self,
        key: String,
        value: Arc<Value>,
        ttl: Option<u64>,
        now_ms: u64,
    ) -> SetOutcome {
        let mut outcome = SetOutcome::default();

        if let Some(previous) = self.entries.remove(&key) {
            self.order.forget(previous.sequence);
            outcome.replaced = true;
        }

        while self.entries.len() >= self.max_entries {
            match self.order.pop_oldest() {
                Some(victim) => {
                    self.entries.remove(&victim);
                    outcome.evicted.push(victim);
                }
                None => break,
            }
        }

        let sequence = self.order.next_sequence();
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.order.record(sequence, &key);
        self.entries
            .insert(key, CacheEntry::new(value, now_ms, ttl, sequence));

        outcome
    }

    // == Get ==
    /// Returns the live entry for `key`.
    ///
    /// Expired entries read as absent even if the sweep has not reclaimed
    /// them yet. Never modifies the store.
    pub fn get(&self, key: &str, now_ms: u64) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now_ms))
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.forget(entry.sequence);
                true
            }
            None => false,
        }
    }

    // == Delete Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Full scan over the key space. Returns the removed keys.
    pub fn delete_prefix(&mut self, prefix: &str) -> Vec<String> {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            self.delete(key);
        }

        matching
    }

    // == Flush ==
    /// Removes every entry. Returns how many were stored.
    pub fn flush(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    // == Remove Expired ==
    /// Removes all entries expired at `now_ms` and returns their keys.
    pub fn remove_expired(&mut self, now_ms: u64) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.delete(key);
        }

        expired
    }

    // == Accessors ==
    /// Returns the current number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    #[cfg(test)]
    pub(crate) fn tracked_len(&self) -> usize {
        self.order.len()
    }
}
