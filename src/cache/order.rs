//! Insertion Order Module
//!
//! Tracks insertion order for oldest-first eviction.

use std::collections::BTreeMap;

// == Insertion Order ==
/// Orders keys by insertion sequence number.
///
/// Lowest sequence = oldest insertion = next eviction candidate. Re-inserting
/// a key (an overwrite) gives it a new, higher sequence.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    by_sequence: BTreeMap<u64, String>,
    next_sequence: u64,
}

impl InsertionOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Next Sequence ==
    /// Allocates a fresh sequence number.
    pub fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    // == Record ==
    /// Records `key` as inserted with `sequence`.
    pub fn record(&mut self, sequence: u64, key: &str) {
        self.by_sequence.insert(sequence, key.to_string());
    }

    // == Forget ==
    /// Drops the record for `sequence`. No-op if absent.
    pub fn forget(&mut self, sequence: u64) {
        self.by_sequence.remove(&sequence);
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest key.
    ///
    /// Returns None if the tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.by_sequence.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.by_sequence.first_key_value().map(|(_, key)| key)
    }

    // == Clear ==
    /// Forgets every key. Sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.by_sequence.clear();
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}
