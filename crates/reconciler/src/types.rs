//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::fmt;

use cirrus_core::Diagnostics;
use cirrus_platform::{GroupMember, NetworkGroup};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One declared membership: the member should belong to `group_id`,
/// exposed as `domain_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredMembership {
    pub group_id: String,
    pub domain_name: String,
}

impl DesiredMembership {
    pub fn new(group_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            domain_name: domain_name.into(),
        }
    }
}

/// A membership as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: String,
    pub domain_name: String,
}

/// Desired state declaration for one member.
///
/// Ordered so that planning is deterministic. Supplied fresh on every
/// reconciliation and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState {
    entries: Vec<DesiredMembership>,
}

impl DesiredState {
    /// Create a new empty desired state (member belongs to no group).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a membership, builder style.
    #[must_use]
    pub fn with(mut self, group_id: impl Into<String>, domain_name: impl Into<String>) -> Self {
        self.push(DesiredMembership::new(group_id, domain_name));
        self
    }

    /// Add a membership.
    pub fn push(&mut self, entry: DesiredMembership) {
        self.entries.push(entry);
    }

    /// Reject entries the reconciler cannot act on.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateGroup` for the first group declared twice and
    /// `Error::InvalidInput` for a blank group id or domain name.
    pub fn validate(&self) -> Result<()> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.group_id.trim().is_empty() || e.domain_name.trim().is_empty())
        {
            return Err(Error::invalid_input(format!(
                "desired membership needs a group id and a domain name, got {entry:?}"
            )));
        }

        let group_ids = self.entries.iter().map(|e| e.group_id.as_str());
        match group_ids.duplicates().next() {
            Some(group_id) => Err(Error::duplicate_group(group_id)),
            None => Ok(()),
        }
    }

    /// Whether the member should belong to this group.
    pub fn contains(&self, group_id: &str) -> bool {
        self.entries.iter().any(|e| e.group_id == group_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DesiredMembership> {
        self.entries.iter()
    }

    /// Get the number of declared memberships.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no membership is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DesiredMembership> for DesiredState {
    fn from_iter<I: IntoIterator<Item = DesiredMembership>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DesiredState {
    type Item = &'a DesiredMembership;
    type IntoIter = std::slice::Iter<'a, DesiredMembership>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Actual state of one member, read from the platform at call time.
#[derive(Debug, Clone, Default)]
pub struct ActualState {
    /// Groups the member currently belongs to, keyed by group id.
    pub groups: BTreeMap<String, GroupMember>,
}

impl ActualState {
    /// Create a new empty actual state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the member's groups from a full organisation listing.
    pub fn from_groups(member_id: &str, groups: &[NetworkGroup]) -> Self {
        let groups = groups
            .iter()
            .filter_map(|g| g.member(member_id).map(|m| (g.id.clone(), m.clone())))
            .collect();
        Self { groups }
    }

    /// Whether the member belongs to this group.
    pub fn contains(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    /// Group ids in sorted order.
    pub fn group_ids(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    /// Memberships in group id order.
    pub fn memberships(&self) -> Vec<Membership> {
        self.groups
            .iter()
            .map(|(group_id, m)| Membership {
                group_id: group_id.clone(),
                domain_name: m.domain_name.clone(),
            })
            .collect_vec()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Why a membership is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    /// The group is no longer declared.
    Stale,
    /// The domain name changed; the membership is re-added afterwards.
    Recreate { previous_domain: String },
}

/// Actions the reconciler can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Add the member to a group.
    AddMember {
        group_id: String,
        kind: String,
        domain_name: String,
    },
    /// Remove the member from a group.
    RemoveMember {
        group_id: String,
        reason: RemovalReason,
    },
}

impl ReconcileAction {
    /// Get the group this action targets.
    pub fn group_id(&self) -> &str {
        match self {
            Self::AddMember { group_id, .. } | Self::RemoveMember { group_id, .. } => group_id,
        }
    }

    /// Whether this is the removal half of a tie-break recreation.
    pub const fn is_recreation(&self) -> bool {
        matches!(
            self,
            Self::RemoveMember {
                reason: RemovalReason::Recreate { .. },
                ..
            }
        )
    }

    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::AddMember {
                group_id,
                domain_name,
                ..
            } => format!("add to {group_id} as {domain_name}"),
            Self::RemoveMember {
                group_id,
                reason: RemovalReason::Stale,
            } => format!("remove from {group_id}"),
            Self::RemoveMember {
                group_id,
                reason: RemovalReason::Recreate { previous_domain },
            } => format!("remove from {group_id} (was {previous_domain}, recreating)"),
        }
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A group whose live membership could not be read during planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    pub group_id: String,
    pub reason: String,
}

/// Ordered actions computed from desired vs actual.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// Recreation removals, then stale removals, then additions.
    pub actions: Vec<ReconcileAction>,
    /// Groups left untouched because their live membership could not be read.
    pub read_failures: Vec<ReadFailure>,
    /// Number of memberships in desired state.
    pub desired_count: usize,
    /// Number of memberships in actual state.
    pub actual_count: usize,
}

impl ReconcilePlan {
    /// Whether nothing needs to change.
    pub fn is_converged(&self) -> bool {
        self.actions.is_empty() && self.read_failures.is_empty()
    }
}

/// Result of reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileResult {
    /// Actions that were applied.
    pub actions_taken: Vec<ReconcileAction>,
    /// Actions that failed, with the reason.
    pub actions_failed: Vec<(ReconcileAction, String)>,
    /// Planned actions that were not applied (dry run).
    pub actions_pending: Vec<ReconcileAction>,
    /// Groups whose live membership could not be read.
    pub read_failures: Vec<ReadFailure>,
    /// Number of memberships in desired state.
    pub desired_count: usize,
    /// Number of memberships in actual state.
    pub actual_count: usize,
    /// Whether actual already matched desired.
    pub converged: bool,
}

impl ReconcileResult {
    /// Create a new reconcile result.
    pub fn new(
        actions_taken: Vec<ReconcileAction>,
        actions_failed: Vec<(ReconcileAction, String)>,
        actions_pending: Vec<ReconcileAction>,
        read_failures: Vec<ReadFailure>,
        desired_count: usize,
        actual_count: usize,
    ) -> Self {
        let converged = actions_taken.is_empty()
            && actions_failed.is_empty()
            && actions_pending.is_empty()
            && read_failures.is_empty();
        Self {
            actions_taken,
            actions_failed,
            actions_pending,
            read_failures,
            desired_count,
            actual_count,
            converged,
        }
    }

    /// Check if all actions succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.actions_failed.is_empty() && self.read_failures.is_empty()
    }

    /// Groups that could not be synced, in the order they failed.
    pub fn failed_groups(&self) -> Vec<&str> {
        self.read_failures
            .iter()
            .map(|f| f.group_id.as_str())
            .chain(self.actions_failed.iter().map(|(a, _)| a.group_id()))
            .unique()
            .collect_vec()
    }

    /// One error diagnostic per failure.
    pub fn diagnostics(&self) -> Diagnostics {
        let reads = self
            .read_failures
            .iter()
            .map(|f| (f.group_id.as_str(), f.reason.as_str()));
        let actions = self
            .actions_failed
            .iter()
            .map(|(a, reason)| (a.group_id(), reason.as_str()));

        reads
            .chain(actions)
            .map(|(group_id, reason)| {
                cirrus_core::Diagnostic::error(format!("failed to sync group {group_id}: {reason}"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, members: &[(&str, &str)]) -> NetworkGroup {
        NetworkGroup {
            id: id.to_string(),
            members: members
                .iter()
                .map(|(member, domain)| GroupMember::new(*member, "application", *domain))
                .collect(),
        }
    }

    #[test]
    fn test_desired_state_rejects_duplicate_groups() {
        let desired = DesiredState::new()
            .with("ng_1", "a.example.com")
            .with("ng_2", "b.example.com")
            .with("ng_1", "c.example.com");

        assert_eq!(desired.validate(), Err(Error::duplicate_group("ng_1")));
    }

    #[test]
    fn test_desired_state_rejects_empty_domain() {
        let desired = DesiredState::new().with("ng_1", "");
        assert!(matches!(desired.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_desired_state_rejects_blank_group_id() {
        let desired = DesiredState::new().with("   ", "a.example.com");
        assert!(matches!(desired.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_empty_desired_state_is_valid() {
        assert!(DesiredState::new().validate().is_ok());
    }

    #[test]
    fn test_actual_state_filters_member() {
        let groups = vec![
            group(
                "ng_1",
                &[("app_1", "a.example.com"), ("app_2", "x.example.com")],
            ),
            group("ng_2", &[("app_2", "y.example.com")]),
            group("ng_3", &[("app_1", "c.example.com")]),
        ];

        let actual = ActualState::from_groups("app_1", &groups);

        let memberships = actual.memberships();
        assert_eq!(actual.group_ids().collect_vec(), vec!["ng_1", "ng_3"]);
        assert_eq!(
            memberships.first().map(|m| m.domain_name.as_str()),
            Some("a.example.com")
        );
    }

    #[test]
    fn test_action_description() {
        let action = ReconcileAction::RemoveMember {
            group_id: "ng_1".to_string(),
            reason: RemovalReason::Recreate {
                previous_domain: "old.example.com".to_string(),
            },
        };
        assert!(action.is_recreation());
        assert!(action.description().contains("recreating"));
        assert_eq!(action.group_id(), "ng_1");
    }

    #[test]
    fn test_result_diagnostics_name_each_group() {
        let failed = ReconcileAction::RemoveMember {
            group_id: "ng_2".to_string(),
            reason: RemovalReason::Stale,
        };
        let result = ReconcileResult::new(
            vec![],
            vec![(failed, "platform unavailable: HTTP 503".to_string())],
            vec![],
            vec![ReadFailure {
                group_id: "ng_4".to_string(),
                reason: "timeout".to_string(),
            }],
            1,
            2,
        );

        let summaries = result
            .diagnostics()
            .iter()
            .map(|d| d.summary.clone())
            .collect_vec();
        assert_eq!(
            summaries,
            vec![
                "failed to sync group ng_4: timeout".to_string(),
                "failed to sync group ng_2: platform unavailable: HTTP 503".to_string(),
            ]
        );
        assert!(!result.converged);
        assert_eq!(result.failed_groups(), vec!["ng_4", "ng_2"]);
    }
}
