//! Serializable snapshots of platform state.
//!
//! A snapshot seeds an [`InMemoryPlatform`](crate::InMemoryPlatform) from a
//! JSON or TOML document and can be written back after a run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{GroupMember, OperationState, StatusSample};

/// Groups per organisation, members per group.
pub type GroupTable = BTreeMap<String, BTreeMap<String, Vec<GroupMember>>>;

/// One scripted answer of a status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusStep {
    /// The operation reports this state.
    Report {
        state: OperationState,
        #[serde(default)]
        metadata: BTreeMap<String, serde_json::Value>,
    },
    /// The status fetch fails with a transient error.
    Unavailable { reason: String },
}

impl StatusStep {
    /// A report without metadata.
    pub fn report(state: OperationState) -> Self {
        Self::Report {
            state,
            metadata: BTreeMap::new(),
        }
    }

    /// A transient fetch failure.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Build the sample this step answers with, stamped now.
    pub(crate) fn to_sample(&self) -> Option<StatusSample> {
        match self {
            Self::Report { state, metadata } => Some(StatusSample {
                metadata: metadata.clone(),
                ..StatusSample::new(*state)
            }),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Complete platform state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    /// `organisation -> group -> members`.
    #[serde(default)]
    pub organisations: GroupTable,
    /// `operation target -> remaining scripted status answers`.
    #[serde(default)]
    pub operations: BTreeMap<String, Vec<StatusStep>>,
}

impl PlatformSnapshot {
    /// Load a snapshot from a `.json` or `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(cirrus_core::load_document(path)?)
    }

    /// Write the snapshot to a `.json` or `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        Ok(cirrus_core::save_document(path, self)?)
    }
}
