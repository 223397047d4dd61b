//! Error types for the platform crate.

use thiserror::Error;

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a remote platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The addressed resource does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The request conflicts with existing state (e.g. member already present).
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    /// The platform could not be reached or answered with a server error.
    #[error("platform unavailable: {reason}")]
    Unavailable { reason: String },

    /// The platform refused the request.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },

    /// The caller passed an argument the platform cannot accept.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Snapshot or document handling failed.
    #[error("core error: {0}")]
    Core(String),
}

impl Error {
    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the addressed resource is absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is worth retrying.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<cirrus_core::Error> for Error {
    fn from(err: cirrus_core::Error) -> Self {
        Self::Core(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::not_found("member app_1 in group ng_1");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "member app_1 in group ng_1 not found");
    }

    #[test]
    fn test_unavailable_is_retryable() {
        assert!(Error::unavailable("HTTP 503").is_retryable());
        assert!(!Error::rejected("HTTP 400").is_retryable());
        assert!(!Error::conflict("already a member").is_retryable());
    }
}
