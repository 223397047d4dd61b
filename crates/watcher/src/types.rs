//! Events and outcomes of a status watch.

use std::fmt;

use cirrus_platform::{OperationState, StatusSample};
use serde::{Deserialize, Serialize};

/// One observed status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Position in the session, starting at 0.
    pub sequence: u64,
    /// The sample that differed from the previous emission.
    pub sample: StatusSample,
    /// State of the previous emission, if any.
    pub previous: Option<OperationState>,
}

impl StatusEvent {
    /// Get the observed state.
    pub fn state(&self) -> OperationState {
        self.sample.state
    }

    /// Whether this is the last event of the session.
    pub fn is_terminal(&self) -> bool {
        self.sample.state.is_terminal()
    }

    /// Human-readable progress line.
    pub fn describe(&self) -> String {
        match self.previous {
            Some(previous) => format!("{previous} -> {}", self.sample.state),
            None => self.sample.state.to_string(),
        }
    }
}

/// How a watch session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A terminal state was emitted.
    Completed(OperationState),
    /// The context was cancelled or its deadline passed.
    Cancelled,
    /// Consecutive fetch failures exceeded the configured ceiling.
    RetriesExhausted { attempts: u32, last_error: String },
    /// The consumer went away.
    ReceiverDropped,
}

impl WatchOutcome {
    /// Whether the operation reached `SUCCEEDED`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(OperationState::Succeeded))
    }

    /// Get the terminal state, if one was reached.
    pub fn terminal_state(&self) -> Option<OperationState> {
        match self {
            Self::Completed(state) => Some(*state),
            _ => None,
        }
    }
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(state) => write!(f, "completed with {state}"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} failed fetches: {last_error}"),
            Self::ReceiverDropped => f.write_str("receiver dropped"),
        }
    }
}
