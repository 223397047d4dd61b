//! Platform data model: network groups, their members, and operation status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of a network group (one membership fact on the platform).
///
/// At most one member per `(group, member_id)` pair exists remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Identifier of the member resource (application, add-on, ...).
    pub member_id: String,
    /// Resource kind of the member, as the platform names it.
    pub kind: String,
    /// FQDN the member is exposed under inside the group.
    pub domain_name: String,
}

impl GroupMember {
    pub fn new(
        member_id: impl Into<String>,
        kind: impl Into<String>,
        domain_name: impl Into<String>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            kind: kind.into(),
            domain_name: domain_name.into(),
        }
    }
}

/// A network group with its member list, as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkGroup {
    pub id: String,
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

impl NetworkGroup {
    /// Find a member by id.
    pub fn member(&self, member_id: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.member_id == member_id)
    }
}

/// Payload for adding a member to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub member_id: String,
    pub kind: String,
    pub domain_name: String,
}

impl From<NewMember> for GroupMember {
    fn from(new: NewMember) -> Self {
        Self {
            member_id: new.member_id,
            kind: new.kind,
            domain_name: new.domain_name,
        }
    }
}

/// State of a long-running platform operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl OperationState {
    /// Whether no further transitions are expected after this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll result for a watched operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSample {
    pub state: OperationState,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl StatusSample {
    /// Create a sample observed now.
    pub fn new(state: OperationState) -> Self {
        Self {
            state,
            observed_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Value equality on the fields a caller observes.
    ///
    /// `observed_at` is ignored: two polls reporting the same state and
    /// metadata are the same status.
    pub fn same_status(&self, other: &Self) -> bool {
        self.state == other.state && self.metadata == other.metadata
    }
}
