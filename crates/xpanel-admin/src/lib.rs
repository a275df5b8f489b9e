//! Client and inbound administration for xpanel.
//!
//! [`Panel`] runs every caller-facing mutation as store write, engine
//! config resync, engine restart. The [`cli`] module exposes it on the
//! command line.

pub mod cli;
mod credential;
mod domain;
mod error;
mod service;

pub use cli::AdminArgs;
pub use credential::{PASSWORD_HEX_LEN, generate_credential};
pub use domain::resolve_domain;
pub use error::AdminError;
pub use service::{ClientEdit, NewClient, Panel};
