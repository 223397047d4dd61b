//! Reconciler implementation.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use cirrus_platform::{NewMember, PlatformApi};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{
    ActualState, DesiredState, Membership, ReadFailure, ReconcileAction, ReconcilePlan,
    ReconcileResult, RemovalReason,
};

/// Configuration for the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Plan and report, but never mutate the platform.
    pub dry_run: bool,
}

/// Trait for executing reconcile actions.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute an action on behalf of `member_id` in the owner's groups.
    async fn execute(
        &self,
        owner_id: &str,
        member_id: &str,
        action: &ReconcileAction,
    ) -> Result<()>;
}

/// Executor that forwards each action to the platform.
pub struct PlatformActionExecutor {
    api: Arc<dyn PlatformApi>,
}

impl PlatformActionExecutor {
    /// Create a new platform action executor.
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ActionExecutor for PlatformActionExecutor {
    async fn execute(
        &self,
        owner_id: &str,
        member_id: &str,
        action: &ReconcileAction,
    ) -> Result<()> {
        match action {
            ReconcileAction::AddMember {
                group_id,
                kind,
                domain_name,
            } => {
                let member = NewMember {
                    member_id: member_id.to_string(),
                    kind: kind.clone(),
                    domain_name: domain_name.clone(),
                };
                self.api
                    .add_member(owner_id, group_id, member)
                    .await
                    .map_err(|e| Error::action_failed(action.description(), e.to_string()))
            }
            ReconcileAction::RemoveMember { group_id, .. } => {
                match self.api.remove_member(owner_id, group_id, member_id).await {
                    Ok(()) => Ok(()),
                    // Already gone is the state we wanted.
                    Err(e) if e.is_not_found() => {
                        debug!(group_id = %group_id, member_id, "Member already absent");
                        Ok(())
                    }
                    Err(e) => Err(Error::action_failed(action.description(), e.to_string())),
                }
            }
        }
    }
}

/// Set reconciler for network-group membership.
///
/// Converges the groups a member belongs to onto a declared set using the
/// fewest add/remove calls. A membership whose domain name changed is
/// removed and re-added, since the platform cannot update it in place.
pub struct Reconciler {
    /// Platform handle used for reads.
    api: Arc<dyn PlatformApi>,
    /// Action executor.
    executor: Arc<dyn ActionExecutor>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        api: Arc<dyn PlatformApi>,
        executor: Arc<dyn ActionExecutor>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            api,
            executor,
            config,
        }
    }

    /// Create a reconciler that applies actions directly on the platform.
    pub fn with_platform_executor(api: Arc<dyn PlatformApi>, config: ReconcilerConfig) -> Self {
        let executor = Arc::new(PlatformActionExecutor::new(Arc::clone(&api)));
        Self::new(api, executor, config)
    }

    /// Read the groups `member_id` currently belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Error::StateFailed` when the group listing fails.
    pub async fn observe(&self, owner_id: &str, member_id: &str) -> Result<ActualState> {
        check_ids(owner_id, member_id)?;

        let groups = self
            .api
            .list_groups(owner_id)
            .await
            .map_err(|e| Error::state_failed(owner_id, e.to_string()))?;

        Ok(ActualState::from_groups(member_id, &groups))
    }

    /// Memberships of `member_id`, sorted by group id. Empty when none.
    ///
    /// # Errors
    ///
    /// Returns `Error::StateFailed` when the group listing fails.
    pub async fn read_membership(
        &self,
        owner_id: &str,
        member_id: &str,
    ) -> Result<Vec<Membership>> {
        self.observe(owner_id, member_id)
            .await
            .map(|actual| actual.memberships())
    }

    /// Compute the actions `reconcile` would apply, without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateGroup` or `Error::InvalidInput` for an unusable
    /// desired set and `Error::StateFailed` when the group listing fails.
    pub async fn plan(
        &self,
        owner_id: &str,
        member_id: &str,
        member_kind: &str,
        desired: &DesiredState,
    ) -> Result<ReconcilePlan> {
        desired.validate()?;
        let actual = self.observe(owner_id, member_id).await?;

        let mut working: BTreeSet<String> = actual.group_ids().cloned().collect();
        let mut actions = Vec::new();
        let mut read_failures = Vec::new();

        // Tie-break: a kept group whose domain changed is removed, then re-added below.
        for entry in desired.iter().filter(|d| actual.contains(&d.group_id)) {
            let lookup = self.api.get_member(owner_id, &entry.group_id, member_id);
            match lookup.await {
                Ok(live) if live.domain_name == entry.domain_name => {}
                Ok(live) => {
                    debug!(
                        group_id = %entry.group_id,
                        from = %live.domain_name,
                        to = %entry.domain_name,
                        "Domain changed, recreating membership"
                    );
                    actions.push(ReconcileAction::RemoveMember {
                        group_id: entry.group_id.clone(),
                        reason: RemovalReason::Recreate {
                            previous_domain: live.domain_name,
                        },
                    });
                    working.remove(&entry.group_id);
                }
                Err(e) if e.is_not_found() => {
                    debug!(group_id = %entry.group_id, "Member vanished since listing");
                    working.remove(&entry.group_id);
                }
                Err(e) => {
                    warn!(group_id = %entry.group_id, error = %e, "Failed to read member");
                    read_failures.push(ReadFailure {
                        group_id: entry.group_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        actions.extend(
            working
                .iter()
                .filter(|group_id| !desired.contains(group_id))
                .map(|group_id| ReconcileAction::RemoveMember {
                    group_id: group_id.clone(),
                    reason: RemovalReason::Stale,
                }),
        );

        actions.extend(
            desired
                .iter()
                .filter(|d| !working.contains(&d.group_id))
                .map(|d| ReconcileAction::AddMember {
                    group_id: d.group_id.clone(),
                    kind: member_kind.to_string(),
                    domain_name: d.domain_name.clone(),
                }),
        );

        Ok(ReconcilePlan {
            actions,
            read_failures,
            desired_count: desired.len(),
            actual_count: actual.len(),
        })
    }

    /// Converge the member's groups onto `desired`.
    ///
    /// Per-group failures do not abort the run; they are collected in the
    /// result. Not transactional: a partial run leaves partial changes, and
    /// running again with the same input finishes the job.
    ///
    /// # Errors
    ///
    /// Returns an error only when reconciliation cannot start: an unusable
    /// desired set or a failed group listing.
    pub async fn reconcile(
        &self,
        owner_id: &str,
        member_id: &str,
        member_kind: &str,
        desired: &DesiredState,
    ) -> Result<ReconcileResult> {
        info!(
            owner_id,
            member_id,
            desired = desired.len(),
            dry_run = self.config.dry_run,
            "Starting reconciliation"
        );

        let plan = self.plan(owner_id, member_id, member_kind, desired).await?;

        if plan.is_converged() {
            debug!("Actual state already matches desired");
        } else {
            debug!(
                actions = plan.actions.len(),
                read_failures = plan.read_failures.len(),
                "Generated actions"
            );
        }

        let (taken, failed, pending) = if self.config.dry_run {
            (Vec::new(), Vec::new(), plan.actions)
        } else {
            let (taken, failed) = self.apply_actions(owner_id, member_id, plan.actions).await;
            (taken, failed, Vec::new())
        };

        let result = ReconcileResult::new(
            taken,
            failed,
            pending,
            plan.read_failures,
            plan.desired_count,
            plan.actual_count,
        );

        if result.converged {
            info!("System converged");
        } else {
            info!(
                actions_taken = result.actions_taken.len(),
                actions_failed = result.actions_failed.len(),
                actions_pending = result.actions_pending.len(),
                read_failures = result.read_failures.len(),
                "Reconciliation complete"
            );
        }

        Ok(result)
    }

    /// Apply a list of actions in order.
    ///
    /// An addition is skipped when the recreation removal for its group failed.
    async fn apply_actions(
        &self,
        owner_id: &str,
        member_id: &str,
        actions: Vec<ReconcileAction>,
    ) -> (Vec<ReconcileAction>, Vec<(ReconcileAction, String)>) {
        let mut taken = Vec::new();
        let mut failed: Vec<(ReconcileAction, String)> = Vec::new();

        for action in actions {
            if matches!(action, ReconcileAction::AddMember { .. })
                && failed
                    .iter()
                    .any(|(f, _)| f.is_recreation() && f.group_id() == action.group_id())
            {
                warn!(action = %action, "Skipping add after failed recreation");
                failed.push((
                    action,
                    "skipped: removing the previous membership failed".to_string(),
                ));
                continue;
            }

            debug!(action = %action, "Applying action");

            match self.executor.execute(owner_id, member_id, &action).await {
                Ok(()) => {
                    taken.push(action);
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "Action failed");
                    failed.push((action, e.to_string()));
                }
            }
        }

        (taken, failed)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

fn check_ids(owner_id: &str, member_id: &str) -> Result<()> {
    for (name, value) in [("owner id", owner_id), ("member id", member_id)] {
        if value.trim().is_empty() {
            return Err(Error::invalid_input(format!("{name} must not be empty")));
        }
    }
    Ok(())
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    api: Option<Arc<dyn PlatformApi>>,
    executor: Option<Arc<dyn ActionExecutor>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            api: None,
            executor: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the platform handle.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn PlatformApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Set a custom action executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable dry run.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.config.dry_run = enabled;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when no platform handle was set.
    pub fn build(self) -> Result<Reconciler> {
        let api = self
            .api
            .ok_or_else(|| Error::invalid_config("Platform API is required"))?;

        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(PlatformActionExecutor::new(Arc::clone(&api))));

        Ok(Reconciler::new(api, executor, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Summarize a plan for logs and previews.
pub fn describe_actions(actions: &[ReconcileAction]) -> String {
    if actions.is_empty() {
        return "no changes".to_string();
    }
    actions.iter().map(ReconcileAction::description).join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_platform::{GroupMember, InMemoryPlatform, PlatformCall};

    const OWNER: &str = "orga_1";
    const MEMBER: &str = "app_1";
    const KIND: &str = "application";

    async fn setup_platform(groups: &[(&str, Option<&str>)]) -> Arc<InMemoryPlatform> {
        let platform = InMemoryPlatform::new_arc();
        for (group_id, domain) in groups {
            platform.create_group(OWNER, group_id).await;
            if let Some(domain) = domain {
                platform
                    .seed_member(OWNER, group_id, GroupMember::new(MEMBER, KIND, *domain))
                    .await;
            }
        }
        platform
    }

    fn setup_reconciler(platform: &Arc<InMemoryPlatform>) -> Reconciler {
        let api: Arc<dyn PlatformApi> = Arc::clone(platform) as Arc<dyn PlatformApi>;
        Reconciler::with_platform_executor(api, ReconcilerConfig::default())
    }

    #[tokio::test]
    async fn test_reconcile_empty() -> Result<()> {
        let platform = setup_platform(&[("ng_1", None)]).await;
        let reconciler = setup_reconciler(&platform);
        let desired = DesiredState::new();

        let plan = reconciler.plan(OWNER, MEMBER, KIND, &desired).await?;
        let result = reconciler.reconcile(OWNER, MEMBER, KIND, &desired).await?;

        assert!(plan.is_converged());
        assert!(result.converged);
        assert!(platform.mutations().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_orders_recreate_then_stale_then_add() -> Result<()> {
        let platform = setup_platform(&[
            ("ng_a", Some("a.example.com")),
            ("ng_b", Some("old.example.com")),
            ("ng_c", None),
            ("ng_z", Some("z.example.com")),
        ])
        .await;
        let reconciler = setup_reconciler(&platform);
        let desired = DesiredState::new()
            .with("ng_c", "c.example.com")
            .with("ng_b", "new.example.com");

        let plan = reconciler.plan(OWNER, MEMBER, KIND, &desired).await?;

        assert!(!plan.is_converged());
        let described = plan
            .actions
            .iter()
            .map(ReconcileAction::description)
            .collect_vec();
        assert_eq!(
            described,
            vec![
                "remove from ng_b (was old.example.com, recreating)".to_string(),
                "remove from ng_a".to_string(),
                "remove from ng_z".to_string(),
                "add to ng_c as c.example.com".to_string(),
                "add to ng_b as new.example.com".to_string(),
            ]
        );
        assert!(platform.mutations().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_read_failure_leaves_group_untouched() -> Result<()> {
        let platform = setup_platform(&[("ng_1", Some("old.example.com"))]).await;
        platform
            .fail_get("ng_1", cirrus_platform::Error::unavailable("HTTP 502"))
            .await;
        let reconciler = setup_reconciler(&platform);
        let desired = DesiredState::new().with("ng_1", "new.example.com");

        let result = reconciler.reconcile(OWNER, MEMBER, KIND, &desired).await?;

        assert!(platform.mutations().await.is_empty());
        assert_eq!(result.failed_groups(), vec!["ng_1"]);
        assert!(!result.converged);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_not_found_counts_as_success() -> Result<()> {
        let platform = setup_platform(&[("ng_1", Some("a.example.com"))]).await;
        platform
            .fail_remove("ng_1", cirrus_platform::Error::not_found("member app_1"))
            .await;
        let reconciler = setup_reconciler(&platform);

        let result = reconciler
            .reconcile(OWNER, MEMBER, KIND, &DesiredState::new())
            .await?;

        assert!(result.all_succeeded());
        assert_eq!(result.actions_taken.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_skipped_after_failed_recreation() -> Result<()> {
        let platform = setup_platform(&[("ng_1", Some("old.example.com"))]).await;
        platform
            .fail_remove("ng_1", cirrus_platform::Error::unavailable("HTTP 503"))
            .await;
        let reconciler = setup_reconciler(&platform);
        let desired = DesiredState::new().with("ng_1", "new.example.com");

        let result = reconciler.reconcile(OWNER, MEMBER, KIND, &desired).await?;

        assert_eq!(result.actions_failed.len(), 2);
        assert!(
            !platform
                .mutations()
                .await
                .iter()
                .any(|c| matches!(c, PlatformCall::AddMember { .. }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates() -> Result<()> {
        let platform = setup_platform(&[("ng_1", Some("a.example.com")), ("ng_2", None)]).await;
        let api: Arc<dyn PlatformApi> = Arc::clone(&platform) as Arc<dyn PlatformApi>;
        let reconciler = ReconcilerBuilder::new()
            .with_api(api)
            .dry_run(true)
            .build()?;
        let desired = DesiredState::new().with("ng_2", "b.example.com");

        let result = reconciler.reconcile(OWNER, MEMBER, KIND, &desired).await?;

        assert_eq!(result.actions_pending.len(), 2);
        assert!(result.actions_taken.is_empty());
        assert!(!result.converged);
        assert!(platform.mutations().await.is_empty());
        Ok(())
    }

    struct RejectingExecutor;

    #[async_trait]
    impl ActionExecutor for RejectingExecutor {
        async fn execute(
            &self,
            _owner_id: &str,
            _member_id: &str,
            action: &ReconcileAction,
        ) -> Result<()> {
            Err(Error::action_failed(action.description(), "rejected"))
        }
    }

    #[tokio::test]
    async fn test_custom_executor_failures_are_collected() -> Result<()> {
        let platform = setup_platform(&[("ng_1", Some("a.example.com")), ("ng_2", None)]).await;
        let api: Arc<dyn PlatformApi> = Arc::clone(&platform) as Arc<dyn PlatformApi>;
        let reconciler = ReconcilerBuilder::new()
            .with_api(api)
            .with_executor(Arc::new(RejectingExecutor))
            .with_config(ReconcilerConfig::default())
            .build()?;
        let desired = DesiredState::new().with("ng_2", "b.example.com");

        let result = reconciler.reconcile(OWNER, MEMBER, KIND, &desired).await?;

        assert_eq!(result.actions_failed.len(), 2);
        assert!(
            result
                .actions_failed
                .iter()
                .all(|(_, reason)| reason.contains("rejected"))
        );
        assert!(!result.converged);
        assert!(platform.mutations().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let platform = setup_platform(&[]).await;
        platform
            .fail_listing(cirrus_platform::Error::unavailable("HTTP 500"))
            .await;
        let reconciler = setup_reconciler(&platform);

        let result = reconciler.read_membership(OWNER, MEMBER).await;

        assert!(matches!(result, Err(Error::StateFailed { .. })));
    }

    #[tokio::test]
    async fn test_empty_member_id_rejected() {
        let platform = setup_platform(&[]).await;
        let reconciler = setup_reconciler(&platform);

        let result = reconciler.read_membership(OWNER, " ").await;

        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        assert!(platform.calls().await.is_empty());
    }

    #[test]
    fn test_builder_requires_api() {
        let result = ReconcilerBuilder::new().dry_run(true).build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_describe_actions() {
        assert_eq!(describe_actions(&[]), "no changes");
        let actions = vec![
            ReconcileAction::RemoveMember {
                group_id: "ng_1".to_string(),
                reason: RemovalReason::Stale,
            },
            ReconcileAction::AddMember {
                group_id: "ng_2".to_string(),
                kind: KIND.to_string(),
                domain_name: "b.example.com".to_string(),
            },
        ];
        assert_eq!(
            describe_actions(&actions),
            "remove from ng_1; add to ng_2 as b.example.com"
        );
    }
}
