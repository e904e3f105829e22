//! Counting store client.
//!
//! The store owns every counter. Keys are ordered lists of string parts joined
//! with a fixed delimiter, so `["2025-01-02", "15:03", "IngestorService", "WARN"]`
//! becomes `2025-01-02 15:03 IngestorService WARN` with the default delimiter.
//!
//! Implementations must make `increment` atomic per key. Reads only need to
//! reflect some earlier consistent set of increments; nothing here requires a
//! snapshot across keys.

mod error;
mod memory;
#[cfg(feature = "redis-store")]
mod redis;


pub use error::*;
pub use memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisStore;

use crate::conf::types::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_KEY_DELIMITER: &str = " ";

#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Atomically add one to the counter identified by `parts`.
    async fn increment(&self, parts: &[&str]) -> Result<(), StoreError>;

    /// Current count for `parts`, or `StoreError::NotFound` when nothing was ever recorded.
    async fn get(&self, parts: &[&str]) -> Result<u64, StoreError>;

    /// Read several counters at once. Every key gets its own result, in input order.
    async fn get_many(&self, keys: &[&[&str]]) -> Vec<Result<u64, StoreError>> {
        let mut out = Vec::with_capacity(keys.len());
        for parts in keys {
            out.push(self.get(parts).await);
        }
        out
    }
}

pub fn join_key(parts: &[&str], delimiter: &str) -> String {
    parts.join(delimiter)
}

/// Build the store selected by configuration.
pub async fn connect(cfg: &StoreConfig) -> Result<Arc<dyn CountingStore>, StoreError> {
    match cfg.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::with_delimiter(&cfg.key_delimiter))),
        #[cfg(feature = "redis-store")]
        StoreBackend::Redis => {
            let store = RedisStore::connect(&cfg.url, &cfg.key_delimiter).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis-store"))]
        StoreBackend::Redis => Err(StoreError::Unsupported {
            backend: "redis".to_string(),
        }),
    }
}
