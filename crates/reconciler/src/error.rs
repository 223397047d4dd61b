//! Error types for the reconciler crate.

use std::fmt;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
///
/// Per-group mutation failures are not errors at this level: they are
/// collected into the reconcile result. These variants cover the cases where
/// reconciliation cannot start at all, plus the executor's own failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Actual state could not be observed.
    StateFailed { owner_id: String, reason: String },
    /// The same group appears twice in the desired membership.
    DuplicateGroup { group_id: String },
    /// An identifier or desired entry is unusable.
    InvalidInput { reason: String },
    /// Action execution failed.
    ActionFailed { action: String, reason: String },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateFailed { owner_id, reason } => {
                write!(f, "failed to list network groups of '{owner_id}': {reason}")
            }
            Self::DuplicateGroup { group_id } => {
                write!(f, "network group '{group_id}' is declared more than once")
            }
            Self::InvalidInput { reason } => {
                write!(f, "invalid input: {reason}")
            }
            Self::ActionFailed { action, reason } => {
                write!(f, "action '{action}' failed: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a state failed error.
    pub fn state_failed(owner_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StateFailed {
            owner_id: owner_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate group error.
    pub fn duplicate_group(group_id: impl Into<String>) -> Self {
        Self::DuplicateGroup {
            group_id: group_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create an action failed error.
    pub fn action_failed(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::state_failed("orga_1", "HTTP 503");
        assert!(err.to_string().contains("orga_1"));
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_duplicate_group() {
        let err = Error::duplicate_group("ng_1");
        assert_eq!(
            err.to_string(),
            "network group 'ng_1' is declared more than once"
        );
    }
}
