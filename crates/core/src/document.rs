//! Loading and saving serde documents from disk.
//!
//! Files ending in `.json` are read as JSON; everything else is TOML.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::result::Result;

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

/// Read and decode a document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not decode into `T`.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    if is_json(path) {
        serde_json::from_str(&content).map_err(|e| Error::json_parse_failed(e.to_string()))
    } else {
        toml::from_str(&content).map_err(|e| Error::toml_parse_failed(e.to_string()))
    }
}

/// Encode and write a document, replacing any existing file.
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written.
pub fn save_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(value).map_err(|e| Error::json_parse_failed(e.to_string()))?
    } else {
        toml::to_string_pretty(value).map_err(|e| Error::toml_parse_failed(e.to_string()))?
    };

    std::fs::write(path, content).map_err(|e| Error::file_write_failed(path, e.to_string()))
}
