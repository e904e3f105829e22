//! Log tallying pipeline
//!
//! Two independent paths meet only in the counting store:
//!
//! write path:
//! tailed line
//! parse_event / classify
//! BucketKey
//! Ingestor -> CountingStore::increment
//!
//! read path (every tick):
//! Clock
//! AggregationWindow
//! WindowAggregator -> CountingStore::get_many
//! ServiceSummary
//! render_report -> output sink
//!
//! Ingestion is open-ended: any key a line produces is counted. Aggregation is
//! closed over the configured services and levels, so counters for anything
//! else are written but never read back.

mod aggregate;
mod ingest;
mod parse;
mod render;
mod run;
mod types;

#[cfg(test)]
mod tests;

pub use aggregate::{AggregateError, WindowAggregator};
pub use ingest::{IngestError, IngestStats, Ingestor, LineOutcome};
pub use parse::{classify, parse_event, truncate_to_minute};
pub use render::{render_report, render_summary};
pub use run::{PipelineError, run_pipeline};
pub use types::{AggregationWindow, BucketKey, FormatError, LogEvent, ServiceSummary};
