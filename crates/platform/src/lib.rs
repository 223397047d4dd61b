//! Remote platform collaborator for cirrus.
//!
//! This crate defines the narrow interface the reconciliation core talks to:
//!
//! - **Types**: network groups, group members, operation status samples
//! - **`PlatformApi`**: list/get/add/remove members, fetch operation status
//! - **`InMemoryPlatform`**: in-process implementation with call recording,
//!   fault injection, and scripted status answers
//! - **Snapshots**: JSON/TOML documents that seed and dump the in-memory platform
//!
//! # Example
//!
//! ```ignore
//! use cirrus_platform::{GroupMember, InMemoryPlatform, PlatformApi};
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = InMemoryPlatform::new();
//!     platform.create_group("orga_1", "ng_backend").await;
//!     let member = GroupMember::new("app_1", "application", "api.internal");
//!     platform.seed_member("orga_1", "ng_backend", member).await;
//!
//!     let groups = platform.list_groups("orga_1").await?;
//!     println!("{} groups", groups.len());
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod api;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod types;

pub use api::PlatformApi;
pub use error::{Error, Result};
pub use memory::{InMemoryPlatform, PlatformCall};
pub use snapshot::{GroupTable, PlatformSnapshot, StatusStep};
pub use types::{GroupMember, NetworkGroup, NewMember, OperationState, StatusSample};
