//! Engine service control through systemd.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use xpanel_core::{DEFAULT_CONTROL_TIMEOUT_SECS, DEFAULT_ENGINE_SERVICE};

use crate::command::{check_success, run};
use crate::error::EngineError;

/// Starts and inspects the engine process.
#[async_trait]
pub trait EngineControl: Send + Sync {
    /// Restart the engine so it picks up the current config file.
    async fn restart(&self) -> Result<(), EngineError>;

    /// Whether the engine is currently running.
    async fn is_active(&self) -> Result<bool, EngineError>;
}

#[async_trait]
impl<T: EngineControl + ?Sized> EngineControl for Arc<T> {
    #[inline]
    async fn restart(&self) -> Result<(), EngineError> {
        (**self).restart().await
    }

    #[inline]
    async fn is_active(&self) -> Result<bool, EngineError> {
        (**self).is_active().await
    }
}

/// `systemctl` driven control of one unit.
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: String,
    service: String,
    timeout: Duration,
}

impl Systemctl {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            program: "systemctl".to_string(),
            service: service.into(),
            timeout: Duration::from_secs(DEFAULT_CONTROL_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn restart_args(&self) -> [&str; 2] {
        ["restart", self.service.as_str()]
    }

    fn is_active_args(&self) -> [&str; 3] {
        ["is-active", "--quiet", self.service.as_str()]
    }
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_SERVICE)
    }
}

#[async_trait]
impl EngineControl for Systemctl {
    async fn restart(&self) -> Result<(), EngineError> {
        let output = run(&self.program, self.restart_args(), self.timeout).await?;
        check_success(&self.program, &output)?;
        info!(service = %self.service, "engine restarted");
        Ok(())
    }

    async fn is_active(&self) -> Result<bool, EngineError> {
        let output = run(&self.program, self.is_active_args(), self.timeout).await?;
        let active = output.status.success();
        debug!(service = %self.service, active, "engine status");
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lines() {
        let ctl = Systemctl::new("xray");
        assert_eq!(ctl.restart_args(), ["restart", "xray"]);
        assert_eq!(ctl.is_active_args(), ["is-active", "--quiet", "xray"]);
        assert_eq!(Systemctl::default().service(), "xray");
    }
}
