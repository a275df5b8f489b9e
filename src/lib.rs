//! # xpanel
//!
//! Client and endpoint manager for an Xray proxy engine.
//!
//! Client accounts and inbound definitions live in two flat files. From
//! them xpanel renders the engine's JSON configuration, builds share links,
//! and periodically removes expired or over-quota clients.
//!
//! ## Crates
//!
//! - [`xpanel_core`] - Records, protocol model and default constants
//! - [`xpanel_store`] - Flat-file and in-memory record stores
//! - [`xpanel_config`] - Panel configuration loading and validation
//! - [`xpanel_render`] - Engine configuration synthesis
//! - [`xpanel_link`] - Share link encoding
//! - [`xpanel_engine`] - Engine stats API and service control
//! - [`xpanel_reconcile`] - Expiry and quota enforcement
//! - [`xpanel_admin`] - Caller-facing operations and CLI

pub use xpanel_admin as admin;
pub use xpanel_config as config;
pub use xpanel_core as core;
pub use xpanel_engine as engine;
pub use xpanel_link as link;
pub use xpanel_reconcile as reconcile;
pub use xpanel_render as render;
pub use xpanel_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use xpanel_admin::{AdminError, Panel};
    pub use xpanel_config::{Config, load_config, validate_config};
    pub use xpanel_core::{Client, Endpoint, Protocol};
    pub use xpanel_reconcile::{PassReport, Reconciler};
    pub use xpanel_render::Synthesizer;
    pub use xpanel_store::{FlatFileStore, MemoryStore, RecordStore};
}
