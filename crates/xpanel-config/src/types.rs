//! Configuration type definitions for the store, engine, reconciler, panel and logging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

/// Panel configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the record files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_clients_path")]
    pub clients_path: String,
    #[serde(default = "default_inbounds_path")]
    pub inbounds_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            clients_path: default_clients_path(),
            inbounds_path: default_inbounds_path(),
        }
    }
}

/// The proxy engine the panel drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path of the generated engine configuration.
    #[serde(default = "default_engine_config")]
    pub config_path: String,
    /// Engine binary used for stats queries. Searched in the usual
    /// install locations when unset.
    #[serde(default)]
    pub binary: Option<String>,
    /// systemd unit name.
    #[serde(default = "default_engine_service")]
    pub service: String,
    /// TLS certificate (PEM) referenced by every inbound.
    #[serde(default = "default_cert_file")]
    pub cert_file: String,
    /// TLS private key (PEM) referenced by every inbound.
    #[serde(default = "default_key_file")]
    pub key_file: String,
    #[serde(default = "default_access_log")]
    pub access_log: String,
    #[serde(default = "default_error_log")]
    pub error_log: String,
    /// Engine log level written into the generated config.
    #[serde(default = "default_engine_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_path: default_engine_config(),
            binary: None,
            service: default_engine_service(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
            access_log: default_access_log(),
            error_log: default_error_log(),
            log_level: default_engine_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Upper bound for one stats query, in seconds.
    #[serde(default = "default_stats_timeout_secs")]
    pub stats_timeout_secs: u64,
    /// Period of watch mode, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound for a service restart or status query, in seconds.
    #[serde(default = "default_control_timeout_secs")]
    pub control_timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            stats_timeout_secs: default_stats_timeout_secs(),
            interval_secs: default_interval_secs(),
            control_timeout_secs: default_control_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Public domain used in share links. Takes precedence over `domain_file`.
    #[serde(default)]
    pub domain: Option<String>,
    /// File holding the public domain, as written by the installer.
    #[serde(default = "default_domain_file")]
    pub domain_file: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            domain: None,
            domain_file: default_domain_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"xpanel_store": "debug"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
