//! Lifecycle reconciler for xpanel clients.
//!
//! Two passes over the record store:
//!
//! - **expiry**: deletes clients whose expiry is in the past
//! - **quota**: reads and resets per-user traffic counters, adds them to
//!   `used` and deletes clients that went over quota
//!
//! Whenever a pass deletes anyone, the engine config is regenerated and
//! the engine restarted.
//!
//! # Usage
//!
//! ```bash
//! xpanel reconcile all
//! xpanel reconcile watch --interval 300
//! ```

pub mod cli;
pub mod error;
pub mod reconciler;
pub mod report;

pub use cli::ReconcileArgs;
pub use error::ReconcileError;
pub use reconciler::Reconciler;
pub use report::{Failure, PassReport, UsageUpdate};
