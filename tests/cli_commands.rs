//! CLI Command Tests - BDD Style
//!
//! Following BDD naming convention: given_<context>_when_<action>_then_<outcome>
//!
//! Commands run through the real dispatcher against a snapshot file, which
//! is read before and written back after each command.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;

use anyhow::Result;
use cirrus::ResourceRegistry;
use cirrus::cli::Cli;
use cirrus::commands::execute_command;
use cirrus_platform::{GroupMember, OperationState, PlatformSnapshot, StatusStep};
use clap::Parser;

const SEED: &str = r#"{
  "organisations": {
    "orga_1": {
      "G1": [{"member_id": "app_1", "kind": "application", "domain_name": "a.example.com"}],
      "G2": [],
      "G3": [{"member_id": "app_1", "kind": "application", "domain_name": "c.example.com"}]
    }
  },
  "operations": {
    "op_1": [
      {"kind": "report", "state": "PENDING"},
      {"kind": "report", "state": "SUCCEEDED"}
    ],
    "op_2": [
      {"kind": "report", "state": "FAILED", "metadata": {"message": "disk full"}}
    ]
  }
}"#;

async fn run(args: &[&str]) -> Result<()> {
    let cli = Cli::try_parse_from(args)?;
    execute_command(cli, &ResourceRegistry::builtin()).await
}

fn seeded_state(dir: &Path) -> Result<String> {
    let path = dir.join("platform.json");
    std::fs::write(&path, SEED)?;
    Ok(path.to_string_lossy().to_string())
}

fn members_of(snapshot: &PlatformSnapshot, group: &str) -> Vec<GroupMember> {
    snapshot
        .organisations
        .get("orga_1")
        .and_then(|groups| groups.get(group))
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn given_seeded_state_when_sync_membership_then_snapshot_converged() -> Result<()> {
    // GIVEN: app_1 in G1 (kept) and G3 (stale)
    let dir = tempfile::tempdir()?;
    let state = seeded_state(dir.path())?;

    // WHEN: syncing onto G1 and G2
    run(&[
        "cirrus",
        "--state",
        &state,
        "sync-membership",
        "--owner",
        "orga_1",
        "--member",
        "app_1",
        "--group",
        "G1=a.example.com",
        "--group",
        "G2=b.example.com",
    ])
    .await?;

    // THEN: the written snapshot holds exactly the desired membership
    let snapshot = PlatformSnapshot::from_file(Path::new(&state))?;
    assert_eq!(
        members_of(&snapshot, "G1"),
        vec![GroupMember::new("app_1", "application", "a.example.com")]
    );
    assert_eq!(
        members_of(&snapshot, "G2"),
        vec![GroupMember::new("app_1", "application", "b.example.com")]
    );
    assert!(members_of(&snapshot, "G3").is_empty());
    Ok(())
}

#[tokio::test]
async fn given_dry_run_when_sync_membership_then_snapshot_unchanged() -> Result<()> {
    // GIVEN: the seeded platform
    let dir = tempfile::tempdir()?;
    let state = seeded_state(dir.path())?;
    let before = PlatformSnapshot::from_file(Path::new(&state))?;

    // WHEN: previewing a removal from every group
    run(&[
        "cirrus",
        "--state",
        &state,
        "sync-membership",
        "-o",
        "orga_1",
        "-m",
        "app_1",
        "--delete",
        "--dry-run",
    ])
    .await?;

    // THEN: nothing changed
    let after = PlatformSnapshot::from_file(Path::new(&state))?;
    assert_eq!(before.organisations, after.organisations);
    Ok(())
}

#[tokio::test]
async fn given_non_member_kind_when_sync_membership_then_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let state = seeded_state(dir.path())?;

    let result = run(&[
        "cirrus",
        "--state",
        &state,
        "sync-membership",
        "-o",
        "orga_1",
        "-m",
        "drain_1",
        "-k",
        "log_drain",
        "--delete",
    ])
    .await;

    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("cannot join network groups (only application, addon, database)"));
    Ok(())
}

#[tokio::test]
async fn given_successful_operation_when_run_operation_then_script_consumed() -> Result<()> {
    // GIVEN: op_1 goes PENDING -> SUCCEEDED
    let dir = tempfile::tempdir()?;
    let state = seeded_state(dir.path())?;

    // WHEN: following it
    run(&[
        "cirrus",
        "--state",
        &state,
        "run-operation",
        "--operation",
        "reboot",
        "--target",
        "op_1",
        "--resource",
        "database",
    ])
    .await?;

    // THEN: only the final answer remains scripted
    let snapshot = PlatformSnapshot::from_file(Path::new(&state))?;
    assert_eq!(
        snapshot.operations.get("op_1"),
        Some(&vec![StatusStep::report(OperationState::Succeeded)])
    );
    Ok(())
}

#[tokio::test]
async fn given_failed_operation_when_run_operation_then_error_names_detail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let state = seeded_state(dir.path())?;

    let result = run(&[
        "cirrus",
        "--state",
        &state,
        "run-operation",
        "--operation",
        "execute-sql",
        "--target",
        "op_2",
    ])
    .await;

    assert!(result.is_err_and(|e| e.to_string().contains("disk full")));
    Ok(())
}

#[tokio::test]
async fn given_unsupported_operation_when_run_operation_then_rejected() {
    let result = run(&[
        "cirrus",
        "run-operation",
        "--operation",
        "execute-sql",
        "--target",
        "op_1",
        "--resource",
        "application",
    ])
    .await;

    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("does not support execute_sql (only database)"));
}

#[tokio::test]
async fn given_drain_file_when_check_drain_then_validated() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let good = dir.path().join("drain.toml");
    std::fs::write(
        &good,
        "kind = \"syslog_tcp\"\nhost = \"logs.example.com\"\nport = 6514\n",
    )?;
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"kind": "http", "url": "ftp://logs.example.com"}"#)?;

    run(&["cirrus", "check-drain", &good.to_string_lossy()]).await?;
    let rejected = run(&["cirrus", "check-drain", &bad.to_string_lossy()]).await;

    assert!(rejected.is_err());
    Ok(())
}

#[tokio::test]
async fn given_no_state_when_kinds_then_succeeds() -> Result<()> {
    run(&["cirrus", "kinds"]).await
}
