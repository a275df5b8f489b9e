//! Per-user traffic counters via the engine's stats API.
//!
//! Counters are read with `-reset`, so a successful read consumes the value.
//! Callers must persist what they get before doing anything else.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use xpanel_core::{ADMIN_API_PORT, ADMIN_LISTEN, DEFAULT_STATS_TIMEOUT_SECS};

use crate::command::{check_success, run};
use crate::error::EngineError;

/// Traffic direction of a user counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Uplink,
    Downlink,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Uplink, Direction::Downlink];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Uplink => "uplink",
            Direction::Downlink => "downlink",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter name the engine registers for a user.
pub fn stat_name(email: &str, direction: Direction) -> String {
    format!("user>>>{email}>>>traffic>>>{direction}")
}

/// Source of per-user byte counters.
#[async_trait]
pub trait TrafficStats: Send + Sync {
    /// Read and zero the counter for `email` in one direction.
    async fn fetch_and_reset(&self, email: &str, direction: Direction)
    -> Result<u64, EngineError>;
}

#[async_trait]
impl<T: TrafficStats + ?Sized> TrafficStats for Arc<T> {
    #[inline]
    async fn fetch_and_reset(
        &self,
        email: &str,
        direction: Direction,
    ) -> Result<u64, EngineError> {
        (**self).fetch_and_reset(email, direction).await
    }
}

#[derive(Debug, Deserialize)]
struct StatResponse {
    #[serde(default)]
    stat: Option<Stat>,
}

#[derive(Debug, Deserialize)]
struct Stat {
    #[serde(default)]
    value: Option<serde_json::Value>,
}

/// Parse `xray api stats` JSON output.
///
/// A missing `stat` or `value` means the counter is zero. The value may be
/// a JSON string or number.
pub fn parse_stat_output(stdout: &[u8]) -> Result<u64, EngineError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    let response: StatResponse =
        serde_json::from_str(text).map_err(|e| EngineError::Parse(e.to_string()))?;
    let Some(value) = response.stat.and_then(|s| s.value) else {
        return Ok(0);
    };
    match value {
        serde_json::Value::String(s) if s.is_empty() => Ok(0),
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| EngineError::Parse(format!("stat value {s:?}"))),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| EngineError::Parse(format!("stat value {n}"))),
        other => Err(EngineError::Parse(format!("stat value {other}"))),
    }
}

/// Stats client that shells out to `xray api stats`.
#[derive(Debug, Clone)]
pub struct XrayApi {
    binary: PathBuf,
    server: String,
    timeout: Duration,
}

impl XrayApi {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            server: format!("{ADMIN_LISTEN}:{ADMIN_API_PORT}"),
            timeout: Duration::from_secs(DEFAULT_STATS_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    fn args(&self, email: &str, direction: Direction) -> Vec<String> {
        vec![
            "api".to_string(),
            "stats".to_string(),
            format!("--server={}", self.server),
            "-name".to_string(),
            stat_name(email, direction),
            "-reset".to_string(),
        ]
    }
}

#[async_trait]
impl TrafficStats for XrayApi {
    async fn fetch_and_reset(
        &self,
        email: &str,
        direction: Direction,
    ) -> Result<u64, EngineError> {
        let output = run(&self.binary, self.args(email, direction), self.timeout).await?;
        check_success(&self.binary.to_string_lossy(), &output)?;
        let bytes = parse_stat_output(&output.stdout)?;
        debug!(email, %direction, bytes, "stats read");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_name() {
        assert_eq!(
            stat_name("alice", Direction::Downlink),
            "user>>>alice>>>traffic>>>downlink"
        );
    }

    #[test]
    fn command_line() {
        let api = XrayApi::new("/usr/local/bin/xray");
        assert_eq!(
            api.args("bob", Direction::Uplink),
            [
                "api",
                "stats",
                "--server=127.0.0.1:10085",
                "-name",
                "user>>>bob>>>traffic>>>uplink",
                "-reset"
            ]
        );
    }

    #[test]
    fn parse_string_and_number_values() {
        assert_eq!(
            parse_stat_output(br#"{"stat":{"name":"x","value":"1024"}}"#).unwrap(),
            1024
        );
        assert_eq!(parse_stat_output(br#"{"stat":{"value":77}}"#).unwrap(), 77);
    }

    #[test]
    fn parse_missing_value_is_zero() {
        assert_eq!(parse_stat_output(br#"{"stat":{"name":"x"}}"#).unwrap(), 0);
        assert_eq!(parse_stat_output(br#"{}"#).unwrap(), 0);
        assert_eq!(parse_stat_output(b"\n").unwrap(), 0);
    }

    #[test]
    fn parse_garbage_is_an_error() {
        assert!(matches!(
            parse_stat_output(b"failed to dial"),
            Err(EngineError::Parse(_))
        ));
        assert!(matches!(
            parse_stat_output(br#"{"stat":{"value":"-3"}}"#),
            Err(EngineError::Parse(_))
        ));
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("xray");
        std::fs::write(&bin, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        bin
    }

    // One test spawns everything so no other test thread forks while a
    // script is open for writing.
    #[cfg(unix)]
    #[tokio::test]
    async fn shells_out_to_binary() {
        let dir = tempfile::tempdir().unwrap();

        let missing = XrayApi::new(dir.path().join("absent"));
        let err = missing
            .fetch_and_reset("alice", Direction::Uplink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));

        let ok = XrayApi::new(script(dir.path(), r#"echo '{"stat":{"value":"4096"}}'"#));
        assert_eq!(
            ok.fetch_and_reset("alice", Direction::Downlink)
                .await
                .unwrap(),
            4096
        );

        let failing = XrayApi::new(script(dir.path(), "echo 'dial failed' >&2\nexit 1"));
        let err = failing
            .fetch_and_reset("alice", Direction::Uplink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Exit { ref stderr, .. } if stderr == "dial failed"));

        let slow = XrayApi::new(script(dir.path(), "sleep 5"))
            .with_timeout(Duration::from_millis(200));
        let err = slow
            .fetch_and_reset("alice", Direction::Uplink)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
