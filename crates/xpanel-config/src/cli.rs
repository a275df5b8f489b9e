//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override clients database path
    #[arg(long)]
    pub db_clients: Option<String>,
    /// Override inbounds database path
    #[arg(long)]
    pub db_inbounds: Option<String>,
    /// Override generated engine config path
    #[arg(long)]
    pub config_xray: Option<String>,
    /// Override engine binary path
    #[arg(long)]
    pub xray_bin: Option<String>,
    /// Override engine systemd unit name
    #[arg(long)]
    pub service: Option<String>,
    /// Override TLS certificate path
    #[arg(long)]
    pub cert_file: Option<String>,
    /// Override TLS key path
    #[arg(long)]
    pub key_file: Option<String>,
    /// Override public domain used in share links
    #[arg(long)]
    pub domain: Option<String>,
    /// Override stats query timeout (seconds)
    #[arg(long)]
    pub stats_timeout_secs: Option<u64>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.db_clients {
        config.store.clients_path = v.clone();
    }
    if let Some(v) = &overrides.db_inbounds {
        config.store.inbounds_path = v.clone();
    }
    if let Some(v) = &overrides.config_xray {
        config.engine.config_path = v.clone();
    }
    if let Some(v) = &overrides.xray_bin {
        config.engine.binary = Some(v.clone());
    }
    if let Some(v) = &overrides.service {
        config.engine.service = v.clone();
    }
    if let Some(v) = &overrides.cert_file {
        config.engine.cert_file = v.clone();
    }
    if let Some(v) = &overrides.key_file {
        config.engine.key_file = v.clone();
    }
    if let Some(v) = &overrides.domain {
        config.panel.domain = Some(v.clone());
    }
    if let Some(v) = overrides.stats_timeout_secs {
        config.reconcile.stats_timeout_secs = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
