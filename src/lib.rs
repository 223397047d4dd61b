//! # cirrus
//!
//! Cloud-platform resource provider core. The library holds the caller
//! layer around the reconciliation crates:
//!
//! - **Lifecycle hooks**: network-group membership on create/update/delete/read
//! - **Operations**: reboot, restart and SQL execution followed to completion
//! - **Registry**: the resource kinds the provider manages
//! - **Resources**: log drain recipients
//! - **Config**: provider configuration from file and environment
//! - **CLI**: command definitions and handlers

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod lifecycle;
pub mod operations;
pub mod registry;
pub mod resources;

pub use config::ProviderConfig;
pub use lifecycle::{MemberSpec, MembershipHook};
pub use operations::{OperationError, OperationKind, OperationRunner};
pub use registry::{ResourceKind, ResourceRegistry};
pub use resources::{DrainRecipient, RecipientKind};
