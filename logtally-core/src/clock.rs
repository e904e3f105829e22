use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of wall-clock time for aggregation windows.
///
/// Times are naive because log lines carry no zone; the clock has to report
/// time in the same zone the log writer uses.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: TimeZoneMode,
}

impl SystemClock {
    pub fn new(zone: TimeZoneMode) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.zone {
            TimeZoneMode::Local => Local::now().naive_local(),
            TimeZoneMode::Utc => Utc::now().naive_utc(),
        }
    }
}

/// Clock that only moves when told to. Used to make window boundaries deterministic.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            millis: AtomicI64::new(at.and_utc().timestamp_millis()),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.millis
            .store(at.and_utc().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis)
            .map(|t| t.naive_utc())
            .unwrap_or_default()
    }
}
