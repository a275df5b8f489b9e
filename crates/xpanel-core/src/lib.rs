//! Core types and constants shared across xpanel crates.
//!
//! This crate provides:
//! - Default paths, ports and engine constants
//! - The closed protocol family / transport model
//! - The `Client` and `Endpoint` records shared by the store, the
//!   synthesizer and the link encoder

pub mod defaults;
pub mod model;
pub mod protocol;
pub mod units;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use model::{Client, Endpoint};
pub use protocol::{Family, ParseProtocolError, Protocol, Transport};
pub use units::{format_bytes, gib_to_bytes};

/// Project name.
pub const PROJECT_NAME: &str = "xpanel";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
