//! The remote state client seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GroupMember, NetworkGroup, NewMember, StatusSample};

/// Capability to read and mutate remote platform state.
///
/// Implementations talk to the platform's control plane. Every call is a
/// fresh read or a single mutation; nothing is cached on this side.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// List every network group owned by an organisation, with members.
    async fn list_groups(&self, owner_id: &str) -> Result<Vec<NetworkGroup>>;

    /// Fetch one member of a group. Absent members yield `Error::NotFound`.
    async fn get_member(
        &self,
        owner_id: &str,
        group_id: &str,
        member_id: &str,
    ) -> Result<GroupMember>;

    /// Add a member to a group.
    async fn add_member(&self, owner_id: &str, group_id: &str, member: NewMember) -> Result<()>;

    /// Remove a member from a group. Absent members yield `Error::NotFound`.
    async fn remove_member(&self, owner_id: &str, group_id: &str, member_id: &str) -> Result<()>;

    /// Fetch the current status of a long-running operation.
    async fn get_status(&self, target_id: &str) -> Result<StatusSample>;
}
