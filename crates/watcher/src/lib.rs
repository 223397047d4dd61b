//! Status watching for long-running platform operations.
//!
//! Reboots, restarts and SQL executions run asynchronously on the platform.
//! A watch polls the operation's status and turns it into an ordered stream
//! of transitions:
//!
//! - **Dedup**: an event is emitted only when the status differs from the
//!   previous emission (state and metadata; the sample timestamp is ignored)
//! - **Termination**: `SUCCEEDED` and `FAILED` are emitted once, then the
//!   channel closes
//! - **Backpressure**: the channel holds one event; polling pauses until the
//!   consumer catches up
//! - **Cancellation**: checked before every poll and every emission
//!
//! # Example
//!
//! ```ignore
//! use cirrus_platform::{InMemoryPlatform, PlatformApi};
//! use cirrus_watcher::{StatusWatcher, WatchConfig, WatchContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform: Arc<dyn PlatformApi> = InMemoryPlatform::new_arc();
//!     let watcher = StatusWatcher::new(platform, WatchConfig::default());
//!
//!     let (ctx, canceller) = WatchContext::new();
//!     let mut session = watcher.watch(ctx, "op_42")?;
//!     while let Some(event) = session.next().await {
//!         println!("{}", event.describe());
//!     }
//!     println!("{}", session.finish().await?);
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod context;
pub mod error;
pub mod types;
pub mod watcher;

pub use config::WatchConfig;
pub use context::{Canceller, WatchContext};
pub use error::{Error, Result};
pub use types::{StatusEvent, WatchOutcome};
pub use watcher::{StatusWatcher, WatchSession};
