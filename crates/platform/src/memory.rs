//! In-process platform implementation.
//!
//! Holds groups and scripted operation statuses in memory, records every
//! call it receives, and can be told to fail specific calls. Used by tests
//! across the workspace and by the CLI when driving a snapshot file.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::PlatformApi;
use crate::error::{Error, Result};
use crate::snapshot::{GroupTable, PlatformSnapshot, StatusStep};
use crate::types::{GroupMember, NetworkGroup, NewMember, StatusSample};

/// A call received by the in-memory platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    ListGroups {
        owner_id: String,
    },
    GetMember {
        owner_id: String,
        group_id: String,
        member_id: String,
    },
    AddMember {
        owner_id: String,
        group_id: String,
        member_id: String,
        domain_name: String,
    },
    RemoveMember {
        owner_id: String,
        group_id: String,
        member_id: String,
    },
    GetStatus {
        target_id: String,
    },
}

impl PlatformCall {
    /// Whether this call changes remote state.
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::AddMember { .. } | Self::RemoveMember { .. })
    }
}

/// Failures to inject, keyed by group id.
#[derive(Debug, Default)]
struct Faults {
    listing: Option<Error>,
    get: HashMap<String, Error>,
    add: HashMap<String, Error>,
    remove: HashMap<String, Error>,
}

/// In-memory platform for testing and snapshot-driven runs.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    groups: RwLock<GroupTable>,
    operations: RwLock<BTreeMap<String, VecDeque<StatusStep>>>,
    faults: RwLock<Faults>,
    calls: RwLock<Vec<PlatformCall>>,
}

impl InMemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty platform wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed a platform from a snapshot.
    pub fn from_snapshot(snapshot: PlatformSnapshot) -> Self {
        let operations = snapshot
            .operations
            .into_iter()
            .map(|(target, steps)| (target, steps.into_iter().collect()))
            .collect();

        Self {
            groups: RwLock::new(snapshot.organisations),
            operations: RwLock::new(operations),
            ..Self::default()
        }
    }

    /// Dump the current state as a snapshot.
    pub async fn snapshot(&self) -> PlatformSnapshot {
        let organisations = self.groups.read().await.clone();
        let operations = self
            .operations
            .read()
            .await
            .iter()
            .map(|(target, steps)| (target.clone(), steps.iter().cloned().collect()))
            .collect();

        PlatformSnapshot {
            organisations,
            operations,
        }
    }

    /// Create an empty group (no-op if it already exists).
    pub async fn create_group(&self, owner_id: &str, group_id: &str) {
        self.groups
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .entry(group_id.to_string())
            .or_default();
    }

    /// Put a member into a group without recording a call.
    pub async fn seed_member(&self, owner_id: &str, group_id: &str, member: GroupMember) {
        let mut groups = self.groups.write().await;
        let members = groups
            .entry(owner_id.to_string())
            .or_default()
            .entry(group_id.to_string())
            .or_default();
        members.retain(|m| m.member_id != member.member_id);
        members.push(member);
    }

    /// Script the answers of a status endpoint.
    ///
    /// Steps are consumed in order; the last one keeps being returned.
    pub async fn script_status(&self, target_id: &str, steps: Vec<StatusStep>) {
        self.operations
            .write()
            .await
            .insert(target_id.to_string(), steps.into_iter().collect());
    }

    /// Make group listings fail.
    pub async fn fail_listing(&self, error: Error) {
        self.faults.write().await.listing = Some(error);
    }

    /// Make member reads in a group fail.
    pub async fn fail_get(&self, group_id: &str, error: Error) {
        self.faults
            .write()
            .await
            .get
            .insert(group_id.to_string(), error);
    }

    /// Make member additions to a group fail.
    pub async fn fail_add(&self, group_id: &str, error: Error) {
        self.faults
            .write()
            .await
            .add
            .insert(group_id.to_string(), error);
    }

    /// Make member removals from a group fail.
    pub async fn fail_remove(&self, group_id: &str, error: Error) {
        self.faults
            .write()
            .await
            .remove
            .insert(group_id.to_string(), error);
    }

    /// Remove every injected failure.
    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.read().await.clone()
    }

    /// Only the mutating calls received so far, in order.
    pub async fn mutations(&self) -> Vec<PlatformCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, call: PlatformCall) {
        debug!(call = ?call, "Platform call");
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl PlatformApi for InMemoryPlatform {
    async fn list_groups(&self, owner_id: &str) -> Result<Vec<NetworkGroup>> {
        self.record(PlatformCall::ListGroups {
            owner_id: owner_id.to_string(),
        })
        .await;

        if let Some(err) = &self.faults.read().await.listing {
            return Err(err.clone());
        }

        let groups = self.groups.read().await;
        Ok(groups
            .get(owner_id)
            .map(|owned| {
                owned
                    .iter()
                    .map(|(id, members)| NetworkGroup {
                        id: id.clone(),
                        members: members.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_member(
        &self,
        owner_id: &str,
        group_id: &str,
        member_id: &str,
    ) -> Result<GroupMember> {
        self.record(PlatformCall::GetMember {
            owner_id: owner_id.to_string(),
            group_id: group_id.to_string(),
            member_id: member_id.to_string(),
        })
        .await;

        if let Some(err) = self.faults.read().await.get.get(group_id) {
            return Err(err.clone());
        }

        self.groups
            .read()
            .await
            .get(owner_id)
            .and_then(|owned| owned.get(group_id))
            .and_then(|members| members.iter().find(|m| m.member_id == member_id))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("member {member_id} in group {group_id}")))
    }

    async fn add_member(&self, owner_id: &str, group_id: &str, member: NewMember) -> Result<()> {
        self.record(PlatformCall::AddMember {
            owner_id: owner_id.to_string(),
            group_id: group_id.to_string(),
            member_id: member.member_id.clone(),
            domain_name: member.domain_name.clone(),
        })
        .await;

        if let Some(err) = self.faults.read().await.add.get(group_id) {
            return Err(err.clone());
        }

        let mut groups = self.groups.write().await;
        let members = groups
            .get_mut(owner_id)
            .and_then(|owned| owned.get_mut(group_id))
            .ok_or_else(|| Error::not_found(format!("network group {group_id}")))?;

        if members.iter().any(|m| m.member_id == member.member_id) {
            return Err(Error::conflict(format!(
                "{} is already a member of {group_id}",
                member.member_id
            )));
        }

        members.push(member.into());
        Ok(())
    }

    async fn remove_member(&self, owner_id: &str, group_id: &str, member_id: &str) -> Result<()> {
        self.record(PlatformCall::RemoveMember {
            owner_id: owner_id.to_string(),
            group_id: group_id.to_string(),
            member_id: member_id.to_string(),
        })
        .await;

        if let Some(err) = self.faults.read().await.remove.get(group_id) {
            return Err(err.clone());
        }

        let mut groups = self.groups.write().await;
        let members = groups
            .get_mut(owner_id)
            .and_then(|owned| owned.get_mut(group_id))
            .ok_or_else(|| Error::not_found(format!("network group {group_id}")))?;

        let before = members.len();
        members.retain(|m| m.member_id != member_id);
        if members.len() == before {
            return Err(Error::not_found(format!("member {member_id} in group {group_id}")));
        }
        Ok(())
    }

    async fn get_status(&self, target_id: &str) -> Result<StatusSample> {
        self.record(PlatformCall::GetStatus {
            target_id: target_id.to_string(),
        })
        .await;

        let mut operations = self.operations.write().await;
        let steps = operations
            .get_mut(target_id)
            .ok_or_else(|| Error::not_found(format!("operation {target_id}")))?;

        let next = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };
        let step = next.ok_or_else(|| Error::not_found(format!("operation {target_id}")))?;

        match step {
            StatusStep::Unavailable { reason } => Err(Error::unavailable(reason)),
            report => report
                .to_sample()
                .ok_or_else(|| Error::unavailable("no status reported")),
        }
    }
}
