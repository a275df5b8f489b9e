//! Configuration validation logic.

use crate::Config;
use crate::loader::ConfigError;

const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const LOG_OUTPUTS: [&str; 2] = ["stdout", "stderr"];

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.clients_path.trim().is_empty() {
        return Err(ConfigError::Validation("store.clients_path is empty".into()));
    }
    if config.store.inbounds_path.trim().is_empty() {
        return Err(ConfigError::Validation("store.inbounds_path is empty".into()));
    }
    if config.store.clients_path == config.store.inbounds_path {
        return Err(ConfigError::Validation(
            "store.clients_path and store.inbounds_path must differ".into(),
        ));
    }
    if config.engine.config_path.trim().is_empty() {
        return Err(ConfigError::Validation("engine.config_path is empty".into()));
    }
    if config.engine.service.trim().is_empty() {
        return Err(ConfigError::Validation("engine.service is empty".into()));
    }
    if config.engine.cert_file.trim().is_empty() || config.engine.key_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "engine.cert_file and engine.key_file are required".into(),
        ));
    }
    if let Some(bin) = &config.engine.binary
        && bin.trim().is_empty()
    {
        return Err(ConfigError::Validation("engine.binary is empty".into()));
    }
    if config.reconcile.stats_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "reconcile.stats_timeout_secs must be > 0".into(),
        ));
    }
    if config.reconcile.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "reconcile.interval_secs must be > 0".into(),
        ));
    }
    if config.reconcile.control_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "reconcile.control_timeout_secs must be > 0".into(),
        ));
    }
    if let Some(domain) = &config.panel.domain
        && (domain.trim().is_empty() || domain.contains(['/', ':', ' ']))
    {
        return Err(ConfigError::Validation(format!(
            "panel.domain {domain:?} is not a bare host name"
        )));
    }
    if let Some(format) = &config.logging.format
        && !LOG_FORMATS.contains(&format.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.format must be one of: {LOG_FORMATS:?}"
        )));
    }
    if let Some(output) = &config.logging.output
        && !LOG_OUTPUTS.contains(&output.as_str())
    {
        return Err(ConfigError::Validation(format!(
            "logging.output must be one of: {LOG_OUTPUTS:?}"
        )));
    }
    Ok(())
}
