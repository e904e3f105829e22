use chrono::{NaiveDateTime, TimeDelta, Timelike};
use std::fmt;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MINUTE_FORMAT: &str = "%H:%M";

/// Identifies one counter: (date, minute, service, level).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub date: String,
    /// `HH:MM`, seconds already dropped.
    pub minute: String,
    pub service: String,
    pub level: String,
}

impl BucketKey {
    pub fn new(
        date: impl Into<String>,
        minute: impl Into<String>,
        service: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            minute: minute.into(),
            service: service.into(),
            level: level.into(),
        }
    }

    /// Key for the counter of `service`/`level` during the minute starting at `at`.
    pub fn for_minute(at: NaiveDateTime, service: &str, level: &str) -> Self {
        Self::new(
            at.format(DATE_FORMAT).to_string(),
            at.format(MINUTE_FORMAT).to_string(),
            service,
            level,
        )
    }

    /// Ordered key parts as handed to the counting store.
    pub fn parts(&self) -> [&str; 4] {
        [&self.date, &self.minute, &self.service, &self.level]
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.date, self.minute, self.service, self.level
        )
    }
}

/// One parsed log line. Borrows from the line and lives only while it is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEvent<'a> {
    pub date: &'a str,
    pub time: &'a str,
    pub service: &'a str,
    pub level: &'a str,
    /// Everything after the level, trimmed. Not used for counting.
    pub remainder: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incorrect log format (expected at least 4 fields, found {fields}): {line}")]
pub struct FormatError {
    pub line: String,
    pub fields: usize,
}

/// Trailing window `[start, end)` at minute granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl AggregationWindow {
    /// Window of `length_minutes` that ends at `now` truncated to the minute.
    pub fn ending_at(now: NaiveDateTime, length_minutes: u32) -> Self {
        let end = truncate_minute(now);
        let start = end - TimeDelta::minutes(i64::from(length_minutes));
        Self { start, end }
    }

    /// Start of every minute in the window, oldest first. `end` is excluded.
    pub fn minutes(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let mut next = self.start;
        std::iter::from_fn(move || {
            if next >= self.end {
                return None;
            }
            let current = next;
            next += TimeDelta::minutes(1);
            Some(current)
        })
    }

    pub fn len_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

/// Seconds and sub-seconds are dropped, never rounded.
pub fn truncate_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Per-level totals for one service over one window.
///
/// `counts[i]` belongs to the i-th configured level; position carries the
/// level so output order never depends on a map's iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSummary {
    pub service: String,
    pub counts: Vec<u64>,
}

impl ServiceSummary {
    pub fn new(service: impl Into<String>, levels: usize) -> Self {
        Self {
            service: service.into(),
            counts: vec![0; levels],
        }
    }
}
