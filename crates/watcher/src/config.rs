//! Polling cadence for status watches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for status polling behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Wait after a successful fetch.
    #[serde(
        rename = "poll_interval_ms",
        with = "duration_millis",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    /// Wait after a failed fetch.
    #[serde(
        rename = "error_interval_ms",
        with = "duration_millis",
        default = "default_error_interval"
    )]
    pub error_interval: Duration,

    /// Consecutive failed fetches tolerated before giving up. `None` retries forever.
    #[serde(default)]
    pub max_fetch_retries: Option<u32>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            error_interval: default_error_interval(),
            max_fetch_retries: None,
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_error_interval() -> Duration {
    Duration::from_millis(250)
}

impl WatchConfig {
    /// Create a config for testing with shorter intervals.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            error_interval: Duration::from_millis(1),
            max_fetch_retries: None,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the error interval.
    #[must_use]
    pub const fn with_error_interval(mut self, interval: Duration) -> Self {
        self.error_interval = interval;
        self
    }

    /// Set the retry ceiling.
    #[must_use]
    pub const fn with_max_fetch_retries(mut self, max: Option<u32>) -> Self {
        self.max_fetch_retries = max;
        self
    }

    /// Whether `failures` consecutive failed fetches exceed the ceiling.
    #[must_use]
    pub fn retries_exhausted(&self, failures: u32) -> bool {
        self.max_fetch_retries.is_some_and(|max| failures > max)
    }
}

/// Serialization helper for Duration as milliseconds.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
