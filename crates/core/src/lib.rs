//! Core types shared by the cirrus crates.
//!
//! - **Diagnostics**: structured, collected, non-fatal failure reports
//! - **Errors**: typed failures for local document handling
//! - **Documents**: JSON/TOML loading for configuration and snapshots

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod result;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use document::{load_document, save_document};
pub use error::Error;
pub use result::{DiagnosticResultExt, Result};
