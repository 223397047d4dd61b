//! Result type definition and extension traits.
//!
//! Provides a combinator that turns failures into diagnostics without
//! unwrap/expect/panic.

use std::fmt::Display;

use crate::diagnostics::Diagnostic;
use crate::error::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for folding any `Result` into the diagnostics path.
pub trait DiagnosticResultExt<T> {
    /// Convert the error into an error diagnostic with the given summary.
    ///
    /// # Errors
    ///
    /// Returns the diagnostic when `self` is `Err`.
    fn or_diagnostic(self, summary: impl Into<String>) -> std::result::Result<T, Diagnostic>;
}

impl<T, E: Display> DiagnosticResultExt<T> for std::result::Result<T, E> {
    fn or_diagnostic(self, summary: impl Into<String>) -> std::result::Result<T, Diagnostic> {
        self.map_err(|e| Diagnostic::error(summary).with_detail(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_diagnostic_keeps_ok() {
        let ok: std::result::Result<u32, String> = Ok(3);
        assert_eq!(ok.or_diagnostic("never used").ok(), Some(3));
    }

    #[test]
    fn test_or_diagnostic_carries_detail() {
        let failed: std::result::Result<u32, String> = Err("timeout".to_string());

        let diagnostic = failed.or_diagnostic("failed to read membership").err();

        assert!(diagnostic.as_ref().is_some_and(Diagnostic::is_error));
        let detail = diagnostic.and_then(|d| d.detail);
        assert_eq!(detail.as_deref(), Some("timeout"));
    }
}
