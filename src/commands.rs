//! CLI command handlers.
//!
//! Every command runs against an in-memory platform seeded from the
//! `--state` snapshot; the snapshot is written back once the command ends,
//! whether it succeeded or not.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cirrus_core::{Diagnostics, load_document};
use cirrus_platform::{InMemoryPlatform, PlatformApi, PlatformSnapshot};
use cirrus_reconciler::{Reconciler, ReconcilerConfig};
use cirrus_watcher::{StatusWatcher, WatchContext};
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::ProviderConfig;
use crate::lifecycle::{MemberSpec, MembershipHook};
use crate::operations::{OperationKind, OperationRunner};
use crate::registry::ResourceRegistry;
use crate::resources::{DrainRecipient, RecipientKind};

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
pub async fn execute_command(cli: Cli, registry: &ResourceRegistry) -> Result<()> {
    let config = ProviderConfig::load(cli.config.as_deref())
        .context("Failed to load provider configuration")?;
    let platform = Arc::new(load_platform(cli.state.as_deref())?);

    let outcome = match cli.command {
        Commands::SyncMembership {
            owner,
            member,
            kind,
            groups,
            delete,
            dry_run,
        } => {
            let spec = MemberSpec {
                owner_id: owner,
                member_id: member,
                kind,
                groups: groups.into_iter().collect(),
            };
            let reconciler_config = ReconcilerConfig {
                dry_run: dry_run || config.reconciler.dry_run,
            };
            cmd_sync_membership(&platform, registry, reconciler_config, spec, delete).await
        }

        Commands::ReadMembership {
            owner,
            member,
            json,
        } => cmd_read_membership(&platform, &owner, &member, json).await,

        Commands::RunOperation {
            operation,
            target,
            resource,
            timeout_secs,
        } => {
            cmd_run_operation(
                &platform,
                registry,
                &config,
                operation,
                &target,
                resource.as_deref(),
                timeout_secs,
            )
            .await
        }

        Commands::CheckDrain { file } => cmd_check_drain(&file),

        Commands::Kinds => {
            cmd_kinds(registry);
            Ok(())
        }
    };

    if let Some(state) = cli.state.as_deref() {
        save_platform(&platform, state).await?;
    }

    outcome
}

/// Seed the platform from the snapshot file, or start empty.
fn load_platform(state: Option<&Path>) -> Result<InMemoryPlatform> {
    match state {
        Some(path) if path.exists() => {
            let snapshot = PlatformSnapshot::from_file(path)
                .with_context(|| format!("Failed to load platform state from {}", path.display()))?;
            info!(path = %path.display(), "Loaded platform state");
            Ok(InMemoryPlatform::from_snapshot(snapshot))
        }
        _ => Ok(InMemoryPlatform::new()),
    }
}

async fn save_platform(platform: &InMemoryPlatform, path: &Path) -> Result<()> {
    platform
        .snapshot()
        .await
        .to_file(path)
        .with_context(|| format!("Failed to save platform state to {}", path.display()))?;
    info!(path = %path.display(), "Saved platform state");
    Ok(())
}

fn as_api(platform: &Arc<InMemoryPlatform>) -> Arc<dyn PlatformApi> {
    Arc::clone(platform) as Arc<dyn PlatformApi>
}

/// Converge a member's network groups.
async fn cmd_sync_membership(
    platform: &Arc<InMemoryPlatform>,
    registry: &ResourceRegistry,
    config: ReconcilerConfig,
    mut spec: MemberSpec,
    delete: bool,
) -> Result<()> {
    let resource = registry
        .get(&spec.kind)
        .ok_or_else(|| anyhow!("Unknown resource kind '{}'", spec.kind))?;
    let Some(member_kind) = resource.member_kind.clone() else {
        let name = &resource.name;
        let members = registry
            .members()
            .map(|k| k.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("Resource kind '{name}' cannot join network groups (only {members})");
    };
    spec.kind = member_kind;

    let dry_run = config.dry_run;
    let reconciler = Reconciler::with_platform_executor(as_api(platform), config);
    let hook = MembershipHook::new(Arc::new(reconciler));

    let diagnostics = if delete {
        hook.delete(&spec).await
    } else {
        hook.update(&spec).await
    };
    report(&diagnostics)?;

    if !dry_run {
        let (memberships, _) = hook.read(&spec.owner_id, &spec.member_id).await;
        println!(
            "{} now belongs to {} network group(s)",
            spec.member_id,
            memberships.len()
        );
    }
    Ok(())
}

/// Print a member's network groups.
async fn cmd_read_membership(
    platform: &Arc<InMemoryPlatform>,
    owner: &str,
    member: &str,
    json: bool,
) -> Result<()> {
    let config = ReconcilerConfig::default();
    let reconciler = Reconciler::with_platform_executor(as_api(platform), config);
    let hook = MembershipHook::new(Arc::new(reconciler));

    let (memberships, diagnostics) = hook.read(owner, member).await;
    report(&diagnostics)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&memberships)?);
    } else if memberships.is_empty() {
        println!("{member} belongs to no network group");
    } else {
        for membership in &memberships {
            println!("{:<24} {}", membership.group_id, membership.domain_name);
        }
    }
    Ok(())
}

/// Follow an operation until it settles. Ctrl+C cancels the watch.
async fn cmd_run_operation(
    platform: &Arc<InMemoryPlatform>,
    registry: &ResourceRegistry,
    config: &ProviderConfig,
    operation: OperationKind,
    target: &str,
    resource: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    if let Some(name) = resource {
        let kind = registry
            .get(name)
            .ok_or_else(|| anyhow!("Unknown resource kind '{name}'"))?;
        if !kind.supports(operation) {
            let supported = registry
                .supporting(operation)
                .map(|k| k.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!("Resource kind '{name}' does not support {operation} (only {supported})");
        }
    }

    let (mut ctx, canceller) = WatchContext::new();
    if let Some(secs) = timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling watch");
            canceller.cancel();
        }
    });

    let runner = OperationRunner::new(StatusWatcher::new(as_api(platform), config.watch.clone()));
    let result = runner
        .run(operation, target, ctx, |line| println!("{line}"))
        .await;
    interrupt.abort();

    let summary = result?;
    println!("{summary}");
    Ok(())
}

/// Validate a drain recipient document.
fn cmd_check_drain(file: &Path) -> Result<()> {
    let recipient: DrainRecipient = load_document(file)
        .with_context(|| format!("Failed to load drain recipient from {}", file.display()))?;
    recipient.validate().map_err(|e| anyhow!(e))?;
    println!("{} recipient -> {}", recipient.kind(), recipient.target());
    Ok(())
}

/// List what the provider manages.
fn cmd_kinds(registry: &ResourceRegistry) {
    println!("Resource kinds:");
    for kind in registry.iter() {
        let membership = kind
            .member_kind
            .as_deref()
            .map(|m| format!(" [network groups as {m}]"))
            .unwrap_or_default();
        let operations = if kind.operations.is_empty() {
            String::new()
        } else {
            let names = kind
                .operations
                .iter()
                .map(|o| o.as_str())
                .collect::<Vec<_>>();
            format!(" [operations: {}]", names.join(", "))
        };
        let (name, summary) = (&kind.name, &kind.summary);
        println!("  {name:<14} {summary}{membership}{operations}");
    }

    let recipients = RecipientKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>();
    println!("Drain recipients: {}", recipients.join(", "));
}

/// Print diagnostics; fail when any is an error.
fn report(diagnostics: &Diagnostics) -> Result<()> {
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }

    let errors = diagnostics.errors().count();
    if errors > 0 {
        bail!("{errors} error(s) reported");
    }
    Ok(())
}
