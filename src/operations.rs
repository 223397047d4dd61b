//! Long-running operations: reboot, restart, SQL execution.
//!
//! The platform runs these asynchronously. The runner watches the operation
//! until it settles and relays each transition to the caller.

use std::fmt;
use std::str::FromStr;

use cirrus_platform::OperationState;
use cirrus_watcher::{StatusWatcher, WatchContext, WatchOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Kinds of long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Reboot,
    Restart,
    ExecuteSql,
}

impl OperationKind {
    /// Every operation kind.
    pub const ALL: [Self; 3] = [Self::Reboot, Self::Restart, Self::ExecuteSql];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::Restart => "restart",
            Self::ExecuteSql => "execute_sql",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Why an operation did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The platform reported `FAILED`.
    #[error("{kind} of {target_id} failed{}", detail_suffix(.detail))]
    Failed {
        kind: OperationKind,
        target_id: String,
        detail: Option<String>,
    },

    /// The caller cancelled, or the deadline passed, before the operation settled.
    #[error("{kind} of {target_id} was cancelled before it finished")]
    Cancelled {
        kind: OperationKind,
        target_id: String,
    },

    /// The status could not be fetched.
    #[error(
        "lost track of {kind} of {target_id} after {attempts} failed fetches: {last_error}"
    )]
    StatusUnavailable {
        kind: OperationKind,
        target_id: String,
        attempts: u32,
        last_error: String,
    },

    /// The watch could not be started or ended abnormally.
    #[error("watch error: {0}")]
    Watch(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl From<cirrus_watcher::Error> for OperationError {
    fn from(err: cirrus_watcher::Error) -> Self {
        Self::Watch(err.to_string())
    }
}

/// Runs long-running operation hooks on top of a status watcher.
pub struct OperationRunner {
    watcher: StatusWatcher,
}

impl OperationRunner {
    /// Create a new operation runner.
    pub fn new(watcher: StatusWatcher) -> Self {
        Self { watcher }
    }

    /// Wait for `target_id` to settle, reporting every transition to `progress`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Failed` when the platform reports `FAILED`,
    /// and the matching variant when the watch is cancelled or gives up.
    pub async fn run(
        &self,
        kind: OperationKind,
        target_id: &str,
        ctx: WatchContext,
        mut progress: impl FnMut(&str) + Send,
    ) -> Result<String, OperationError> {
        info!(kind = %kind, target_id, "Waiting for operation");

        let mut session = self.watcher.watch(ctx, target_id)?;
        let mut transitions = 0usize;
        let mut detail = None;

        while let Some(event) = session.next().await {
            transitions += 1;
            progress(&format!("{kind} {target_id}: {}", event.describe()));
            if event.state() == OperationState::Failed {
                detail = event
                    .sample
                    .metadata
                    .get("message")
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string));
            }
        }

        match session.finish().await? {
            WatchOutcome::Completed(OperationState::Succeeded) => {
                let summary =
                    format!("{kind} of {target_id} succeeded after {transitions} transitions");
                info!(kind = %kind, target_id, "Operation succeeded");
                Ok(summary)
            }
            WatchOutcome::Completed(_) => {
                warn!(kind = %kind, target_id, "Operation failed");
                Err(OperationError::Failed {
                    kind,
                    target_id: target_id.to_string(),
                    detail,
                })
            }
            WatchOutcome::Cancelled => Err(OperationError::Cancelled {
                kind,
                target_id: target_id.to_string(),
            }),
            WatchOutcome::RetriesExhausted {
                attempts,
                last_error,
            } => Err(OperationError::StatusUnavailable {
                kind,
                target_id: target_id.to_string(),
                attempts,
                last_error,
            }),
            WatchOutcome::ReceiverDropped => Err(OperationError::Watch(
                "event channel closed unexpectedly".to_string(),
            )),
        }
    }
}
