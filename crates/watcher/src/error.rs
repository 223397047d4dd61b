//! Error types for the watcher crate.

use thiserror::Error;

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from starting or joining a watch.
///
/// Fetch failures never appear here; the polling task retries them and
/// reports exhaustion through `WatchOutcome`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The target id cannot be watched.
    #[error("invalid watch target: {reason}")]
    InvalidTarget { reason: String },

    /// The polling task panicked or was aborted.
    #[error("watch task failed: {reason}")]
    TaskFailed { reason: String },
}

impl Error {
    /// Create an invalid target error.
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    /// Create a task failed error.
    pub fn task_failed(reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::task_failed(err.to_string())
    }
}
