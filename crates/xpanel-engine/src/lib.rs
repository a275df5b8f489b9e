//! Collaborators for the Xray engine process.
//!
//! - [`TrafficStats`] reads and resets per-user byte counters
//!   ([`XrayApi`] shells out to `xray api stats`).
//! - [`EngineControl`] restarts the engine and reports whether it runs
//!   ([`Systemctl`]).
//! - [`AccessLog`] tells which users appear in recent access log lines.
//! - [`resolve_binary`] finds the engine executable.

mod access;
mod binary;
mod command;
mod control;
mod error;
pub mod fake;
mod stats;

pub use access::{AccessLog, DEFAULT_TAIL_LINES, online_in};
pub use binary::{resolve_binary, resolve_binary_in};
pub use control::{EngineControl, Systemctl};
pub use error::EngineError;
pub use stats::{Direction, TrafficStats, XrayApi, parse_stat_output, stat_name};
