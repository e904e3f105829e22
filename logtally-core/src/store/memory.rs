use crate::store::{CountingStore, DEFAULT_KEY_DELIMITER, StoreError, join_key};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-process counting store.
///
/// Increments take the shard lock for their key, so concurrent increments of
/// one key never lose updates.
#[derive(Debug)]
pub struct MemoryStore {
    counters: DashMap<String, u64>,
    delimiter: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_KEY_DELIMITER)
    }

    pub fn with_delimiter(delimiter: &str) -> Self {
        Self {
            counters: DashMap::new(),
            delimiter: delimiter.to_string(),
        }
    }

    /// Seed a counter directly.
    pub fn set(&self, parts: &[&str], value: u64) {
        self.counters
            .insert(join_key(parts, &self.delimiter), value);
    }

    /// Peek at a counter without going through the async API. Absent keys read as 0.
    pub fn value(&self, parts: &[&str]) -> u64 {
        self.counters
            .get(&join_key(parts, &self.delimiter))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        self.counters.iter().map(|entry| *entry.value()).sum()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CountingStore for MemoryStore {
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError> {
        let key = join_key(parts, &self.delimiter);
        *self.counters.entry(key).or_insert(0) += 1;
        Ok(())
    }

    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError> {
        let key = join_key(parts, &self.delimiter);
        match self.counters.get(&key) {
            Some(v) => Ok(*v),
            None => Err(StoreError::not_found(key)),
        }
    }
}
