//! Lifecycle hooks for resources that belong to network groups.
//!
//! Each hook folds reconciler results into diagnostics; none of them fail.

use std::sync::Arc;

use cirrus_core::{Diagnostic, DiagnosticResultExt, Diagnostics};
use cirrus_reconciler::{DesiredState, Membership, Reconciler, describe_actions};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Declared network-group membership of one member resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub owner_id: String,
    pub member_id: String,
    /// Member kind as the platform names it.
    pub kind: String,
    #[serde(default)]
    pub groups: DesiredState,
}

/// Membership hooks run on create, update, delete and read.
pub struct MembershipHook {
    reconciler: Arc<Reconciler>,
}

impl MembershipHook {
    /// Create a new membership hook.
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Join the declared groups after the member was created.
    pub async fn create(&self, spec: &MemberSpec) -> Diagnostics {
        self.sync(spec, &spec.groups).await
    }

    /// Converge onto the declared groups after an update.
    pub async fn update(&self, spec: &MemberSpec) -> Diagnostics {
        self.sync(spec, &spec.groups).await
    }

    /// Leave every group before the member is deleted.
    pub async fn delete(&self, spec: &MemberSpec) -> Diagnostics {
        self.sync(spec, &DesiredState::new()).await
    }

    /// Read the member's current groups.
    pub async fn read(&self, owner_id: &str, member_id: &str) -> (Vec<Membership>, Diagnostics) {
        let read = self
            .reconciler
            .read_membership(owner_id, member_id)
            .await
            .or_diagnostic(format!("failed to read network groups of {member_id}"));

        match read {
            Ok(memberships) => (memberships, Diagnostics::new()),
            Err(diagnostic) => {
                warn!(owner_id, member_id, %diagnostic, "Failed to read network groups");
                (Vec::new(), diagnostic.into())
            }
        }
    }

    async fn sync(&self, spec: &MemberSpec, desired: &DesiredState) -> Diagnostics {
        let result = self
            .reconciler
            .reconcile(&spec.owner_id, &spec.member_id, &spec.kind, desired)
            .await;

        match result {
            Ok(result) => {
                let mut diags = result.diagnostics();
                if !result.actions_pending.is_empty() {
                    let pending = describe_actions(&result.actions_pending);
                    diags.add_warning(format!("dry run, not applied: {pending}"));
                }
                info!(
                    member_id = %spec.member_id,
                    applied = result.actions_taken.len(),
                    failed = result.actions_failed.len(),
                    "Network groups synced"
                );
                diags
            }
            Err(e) => {
                warn!(member_id = %spec.member_id, error = %e, "Failed to sync network groups");
                let summary = format!("failed to sync network groups of {}", spec.member_id);
                Diagnostic::error(summary).with_detail(e.to_string()).into()
            }
        }
    }
}
