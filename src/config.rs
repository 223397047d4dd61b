//! Provider configuration.
//!
//! Loaded from a TOML or JSON file, then overridden by `CIRRUS_*`
//! environment variables.

use std::path::Path;
use std::time::Duration;

use cirrus_core::{Error, Result, load_document};
use cirrus_reconciler::ReconcilerConfig;
use cirrus_watcher::WatchConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding the poll interval, in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "CIRRUS_POLL_INTERVAL_MS";
/// Environment variable overriding the error interval, in milliseconds.
pub const ENV_ERROR_INTERVAL_MS: &str = "CIRRUS_ERROR_INTERVAL_MS";
/// Environment variable setting the fetch retry ceiling. Empty means unbounded.
pub const ENV_MAX_FETCH_RETRIES: &str = "CIRRUS_MAX_FETCH_RETRIES";
/// Environment variable enabling dry-run reconciliation.
pub const ENV_DRY_RUN: &str = "CIRRUS_DRY_RUN";

/// Configuration for the provider core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Status polling cadence.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Membership reconciliation options.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl ProviderConfig {
    /// Create configuration from environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from a file (JSON when the extension is `.json`,
    /// TOML otherwise).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = load_document(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if given, otherwise the defaults, then apply the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment variable is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path)?.with_env_overrides(|key| std::env::var(key).ok()),
            None => Self::from_env(),
        }
    }

    /// Apply overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when a value cannot be parsed.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.watch.poll_interval = Duration::from_millis(parse_var(ENV_POLL_INTERVAL_MS, &ms)?);
        }
        if let Some(ms) = lookup(ENV_ERROR_INTERVAL_MS) {
            self.watch.error_interval =
                Duration::from_millis(parse_var(ENV_ERROR_INTERVAL_MS, &ms)?);
        }
        if let Some(max) = lookup(ENV_MAX_FETCH_RETRIES) {
            self.watch.max_fetch_retries = if max.trim().is_empty() {
                None
            } else {
                Some(parse_var(ENV_MAX_FETCH_RETRIES, &max)?)
            };
        }
        if let Some(flag) = lookup(ENV_DRY_RUN) {
            self.reconciler.dry_run = parse_flag(ENV_DRY_RUN, &flag)?;
        }

        debug!(config = ?self, "Provider configuration resolved");
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the watcher cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for a zero poll interval.
    pub fn validate(&self) -> Result<()> {
        if self.watch.poll_interval.is_zero() {
            return Err(Error::invalid_config("poll interval must be positive"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::invalid_config(format!("{key}={value}: {e}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::invalid_config(format!("{key}={other}: expected a boolean"))),
    }
}
