//! In-process stand-ins for the engine collaborators.
//!
//! Used by tests and dry runs where no engine is installed.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::control::EngineControl;
use crate::error::EngineError;
use crate::stats::{Direction, TrafficStats};

/// Counters held in memory with the engine's read-and-reset behaviour.
#[derive(Debug, Default)]
pub struct ScriptedStats {
    counters: Mutex<HashMap<(String, Direction), u64>>,
    failing: Mutex<HashMap<(String, Direction), String>>,
    calls: Mutex<Vec<(String, Direction)>>,
}

impl ScriptedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` to a counter.
    pub fn add(&self, email: &str, direction: Direction, bytes: u64) {
        *self
            .counters
            .lock()
            .entry((email.to_string(), direction))
            .or_default() += bytes;
    }

    /// Make every read of a counter fail with `message`.
    pub fn fail(&self, email: &str, direction: Direction, message: &str) {
        self.failing
            .lock()
            .insert((email.to_string(), direction), message.to_string());
    }

    /// Reads performed so far, in order.
    pub fn calls(&self) -> Vec<(String, Direction)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TrafficStats for ScriptedStats {
    async fn fetch_and_reset(
        &self,
        email: &str,
        direction: Direction,
    ) -> Result<u64, EngineError> {
        let key = (email.to_string(), direction);
        self.calls.lock().push(key.clone());
        if let Some(message) = self.failing.lock().get(&key) {
            return Err(EngineError::Exit {
                program: "xray".to_string(),
                status: "exit status: 1".to_string(),
                stderr: message.clone(),
            });
        }
        Ok(self.counters.lock().remove(&key).unwrap_or(0))
    }
}

/// Control that only counts what it was asked to do.
#[derive(Debug)]
pub struct RecordingControl {
    restarts: Mutex<usize>,
    active: Mutex<bool>,
    fail_restart: Mutex<bool>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self {
            restarts: Mutex::new(0),
            active: Mutex::new(true),
            fail_restart: Mutex::new(false),
        }
    }

    pub fn restarts(&self) -> usize {
        *self.restarts.lock()
    }

    pub fn set_active(&self, active: bool) {
        *self.active.lock() = active;
    }

    pub fn set_fail_restart(&self, fail: bool) {
        *self.fail_restart.lock() = fail;
    }
}

impl Default for RecordingControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineControl for RecordingControl {
    async fn restart(&self) -> Result<(), EngineError> {
        if *self.fail_restart.lock() {
            return Err(EngineError::Exit {
                program: "systemctl".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Unit xray.service not found.".to_string(),
            });
        }
        *self.restarts.lock() += 1;
        Ok(())
    }

    async fn is_active(&self) -> Result<bool, EngineError> {
        Ok(*self.active.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_reset_counters() {
        let stats = ScriptedStats::new();
        stats.add("alice", Direction::Uplink, 10);
        stats.add("alice", Direction::Uplink, 5);

        assert_eq!(stats.fetch_and_reset("alice", Direction::Uplink).await.unwrap(), 15);
        assert_eq!(stats.fetch_and_reset("alice", Direction::Uplink).await.unwrap(), 0);
        assert_eq!(stats.calls().len(), 2);
    }

    #[tokio::test]
    async fn recording_control_counts() {
        let ctl = RecordingControl::new();
        ctl.restart().await.unwrap();
        assert_eq!(ctl.restarts(), 1);
        ctl.set_fail_restart(true);
        assert!(ctl.restart().await.is_err());
        assert_eq!(ctl.restarts(), 1);
    }
}
