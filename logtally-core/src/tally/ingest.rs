use crate::store::{CountingStore, StoreError};
use crate::tally::parse::classify;
use crate::tally::types::BucketKey;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to count {key}: {source}")]
    StoreWrite {
        key: BucketKey,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Counted(BucketKey),
    Skipped,
}

#[derive(Debug, Default)]
pub struct IngestStats {
    lines: AtomicU64,
    malformed: AtomicU64,
    counted: AtomicU64,
}

impl IngestStats {
    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn counted(&self) -> u64 {
        self.counted.load(Ordering::Relaxed)
    }
}

/// Turns tailed lines into counter increments.
///
/// Failure policy:
/// - a malformed line is logged and skipped (`Ok(LineOutcome::Skipped)`);
/// - a failed increment is returned as `IngestError::StoreWrite`. The tailer
///   treats it as fatal, since silently losing counts is worse than stopping.
pub struct Ingestor {
    store: Arc<dyn CountingStore>,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(store: Arc<dyn CountingStore>) -> Self {
        Self {
            store,
            stats: IngestStats::default(),
        }
    }

    pub async fn ingest_line(&self, line: &str) -> Result<LineOutcome, IngestError> {
        self.stats.lines.fetch_add(1, Ordering::Relaxed);

        let key = match classify(line) {
            Ok(key) => key,
            Err(err) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(line = %err.line, fields = err.fields, "incorrect log format; skipping line");
                return Ok(LineOutcome::Skipped);
            }
        };

        if let Err(source) = self.store.increment(&key.parts()).await {
            return Err(IngestError::StoreWrite { key, source });
        }

        self.stats.counted.fetch_add(1, Ordering::Relaxed);
        Ok(LineOutcome::Counted(key))
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }
}
