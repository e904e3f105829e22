//! Follows an append-only log file across rotation and truncation.
//!
//! The tailer is a three-state machine (see `TailState`):
//!
//! Reading       --drained-->         AwaitingEvent
//! AwaitingEvent --written-->         Reading
//! AwaitingEvent --removed/renamed--> Reopening
//! Reopening     --reopened-->        Reading
//!
//! Filesystem notifications come from an `EventSource`, which lets tests
//! drive the machine with synthetic events.
//!
//! Lines read after a reopen start at the beginning of the new file. Nothing
//! is deduplicated against what was read before the rotation.

mod error;
mod reader;
mod state;
mod tailer;
mod watch;

#[cfg(test)]
mod tests;

pub use error::TailError;
pub use reader::{LineReader, PathStatus};
pub use state::{FileEvent, TailState};
pub use tailer::Tailer;
pub use watch::{EventSource, NotifySource, classify_event_kind};
