//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use cirrus_reconciler::DesiredMembership;
use clap::{Parser, Subcommand};

use crate::operations::OperationKind;

/// cirrus - cloud-platform resource provider core
#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(version)]
#[command(
    about = "Converge network-group membership and follow long-running platform operations"
)]
#[command(
    long_about = "cirrus reconciles which network groups a resource belongs to and watches reboots, restarts and SQL executions until they settle. Platform state is read from and written back to a snapshot file."
)]
pub struct Cli {
    /// Provider configuration file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Platform snapshot file, read before the command and written back after
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge a resource's network groups onto the given set
    SyncMembership {
        /// Organisation owning the groups
        #[arg(short, long)]
        owner: String,

        /// Member resource id
        #[arg(short, long)]
        member: String,

        /// Resource kind of the member (see `cirrus kinds`)
        #[arg(short, long, default_value = "application")]
        kind: String,

        /// Desired membership as GROUP=DOMAIN (repeatable)
        #[arg(short, long = "group", value_parser = parse_group)]
        groups: Vec<DesiredMembership>,

        /// Leave every group, as on resource deletion
        #[arg(long, default_value_t = false, conflicts_with = "groups")]
        delete: bool,

        /// Dry run mode (preview only)
        #[arg(short, long, default_value_t = false)]
        dry_run: bool,
    },

    /// Show the network groups a resource belongs to
    ReadMembership {
        /// Organisation owning the groups
        #[arg(short, long)]
        owner: String,

        /// Member resource id
        #[arg(short, long)]
        member: String,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Follow a long-running operation until it settles
    RunOperation {
        /// Operation kind (reboot, restart, execute-sql)
        #[arg(long)]
        operation: OperationKind,

        /// Operation target id
        #[arg(short, long)]
        target: String,

        /// Resource kind the operation runs on; checked against the registry
        #[arg(short, long)]
        resource: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Validate a log drain recipient document
    CheckDrain {
        /// Recipient file (TOML, or JSON with a .json extension)
        file: PathBuf,
    },

    /// List resource kinds, operations and drain recipients
    Kinds,
}

/// Parse `GROUP=DOMAIN`.
fn parse_group(value: &str) -> Result<DesiredMembership, String> {
    match value.split_once('=') {
        Some((group, domain)) if !group.trim().is_empty() && !domain.trim().is_empty() => {
            Ok(DesiredMembership::new(group.trim(), domain.trim()))
        }
        _ => Err(format!("expected GROUP=DOMAIN, got '{value}'")),
    }
}
