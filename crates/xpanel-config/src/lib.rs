//! Configuration loading and CLI definitions.

mod cli;
mod defaults;
mod loader;
mod logging;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config, load_or_default};
pub use logging::{filter_directives, init_tracing};
pub use types::{Config, EngineConfig, LoggingConfig, PanelConfig, ReconcileConfig, StoreConfig};
pub use validate::validate_config;
