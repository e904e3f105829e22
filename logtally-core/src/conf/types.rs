use crate::clock::TimeZoneMode;
use crate::store::DEFAULT_KEY_DELIMITER;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TallyConfig {
    pub store: StoreConfig,
    pub aggregate: AggregateConfig,
    pub tail: TailConfig,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use clap::ValueEnum;
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Connection URL, only used by the redis backend.
    pub url: String,

    /// Joins the parts of a bucket key into one store key.
    pub key_delimiter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_delimiter: DEFAULT_KEY_DELIMITER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Seconds between two reports.
    pub interval_seconds: u64,

    /// Length of the trailing window, in whole minutes.
    pub window_minutes: u32,

    /// Services reported on, in output order.
    pub services: Vec<String>,

    /// Levels reported per service, in output order.
    pub levels: Vec<String>,

    /// Zone the log writer stamps lines in.
    pub timezone: TimeZoneMode,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            window_minutes: 5 * 60,
            services: vec!["IngestorService".to_string(), "ProcessorService".to_string()],
            levels: vec!["ERROR".to_string(), "WARN".to_string(), "INFO".to_string()],
            timezone: TimeZoneMode::Local,
        }
    }
}

impl AggregateConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TailConfig {
    /// How long a rotated-away path may stay missing before reopening fails.
    pub reopen_timeout_ms: u64,

    /// Pause between reopen attempts.
    pub reopen_backoff_ms: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            reopen_timeout_ms: 5000,
            reopen_backoff_ms: 100,
        }
    }
}

impl TailConfig {
    pub fn reopen_timeout(&self) -> Duration {
        Duration::from_millis(self.reopen_timeout_ms)
    }

    pub fn reopen_backoff(&self) -> Duration {
        Duration::from_millis(self.reopen_backoff_ms)
    }
}
