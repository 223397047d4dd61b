//! Network-group membership reconciliation.
//!
//! One member (an application or add-on) is declared to belong to a set of
//! network groups, each with the domain name it should be reachable under.
//! The reconciler reads what the platform currently has and issues the
//! fewest add/remove calls that make the two match:
//!
//! - **Desired State**: the declared `(group, domain)` pairs
//! - **Actual State**: read fresh from the platform on every run
//! - **Plan**: recreation removals, stale removals, then additions
//! - **Apply**: sequential, failures collected per group
//!
//! The platform cannot change a member's domain name in place, so a domain
//! change is applied as remove-then-add.
//!
//! # Example
//!
//! ```ignore
//! use cirrus_platform::{InMemoryPlatform, PlatformApi};
//! use cirrus_reconciler::{DesiredState, Reconciler, ReconcilerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform: Arc<dyn PlatformApi> = InMemoryPlatform::new_arc();
//!     let reconciler = Reconciler::with_platform_executor(platform, ReconcilerConfig::default());
//!
//!     let desired = DesiredState::new().with("ng_backend", "api.internal");
//!     let result = reconciler
//!         .reconcile("orga_1", "app_1", "application", &desired)
//!         .await?;
//!
//!     for diagnostic in result.diagnostics() {
//!         eprintln!("{diagnostic}");
//!     }
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod reconciler;
pub mod types;

pub use error::{Error, Result};
pub use reconciler::{
    ActionExecutor, PlatformActionExecutor, Reconciler, ReconcilerBuilder, ReconcilerConfig,
    describe_actions,
};
pub use types::{
    ActualState, DesiredMembership, DesiredState, Membership, ReadFailure, ReconcileAction,
    ReconcilePlan, ReconcileResult, RemovalReason,
};
