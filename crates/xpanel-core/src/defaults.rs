//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Record Store Defaults
// ============================================================================

/// Default clients file.
pub const DEFAULT_CLIENTS_PATH: &str = "/etc/xray/clients.db";
/// Default inbound endpoints file.
pub const DEFAULT_INBOUNDS_PATH: &str = "/etc/xray/inbounds.db";
/// Field delimiter used by both record files.
pub const RECORD_DELIMITER: char = ';';
/// Timestamp layout of the `expiry` column.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Status token written in front of every endpoint line.
pub const ENDPOINT_STATUS_ACTIVE: &str = "active";

// ============================================================================
// Engine Defaults
// ============================================================================

/// Default engine configuration file.
pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "/usr/local/etc/xray/config.json";
/// Engine binary locations probed when none is configured.
pub const DEFAULT_ENGINE_BINARIES: &[&str] = &["/usr/local/bin/xray", "/usr/bin/xray"];
/// Default systemd unit of the engine.
pub const DEFAULT_ENGINE_SERVICE: &str = "xray";
/// Loopback address the administrative inbound binds to.
pub const ADMIN_LISTEN: &str = "127.0.0.1";
/// Reserved port of the administrative (stats API) inbound.
pub const ADMIN_API_PORT: u16 = 10085;
/// Tag of the administrative inbound, API block and routing outbound.
pub const ADMIN_TAG: &str = "api";
/// Default TLS certificate referenced by every user inbound.
pub const DEFAULT_CERT_FILE: &str = "/etc/xray/xray.crt";
/// Default TLS key referenced by every user inbound.
pub const DEFAULT_KEY_FILE: &str = "/etc/xray/xray.key";
/// Default engine access log.
pub const DEFAULT_ACCESS_LOG: &str = "/var/log/xray/access.log";
/// Default engine error log.
pub const DEFAULT_ERROR_LOG: &str = "/var/log/xray/error.log";
/// Default engine log level.
pub const DEFAULT_ENGINE_LOG_LEVEL: &str = "warning";

// ============================================================================
// Inbound Constants
// ============================================================================

/// Port that gets a plain-HTTP fallback attached.
pub const FALLBACK_PORT: u16 = 443;
/// Fallback destination for probes on the shared port.
pub const FALLBACK_DEST: u16 = 80;
/// Flow marker enabling the vision fast path.
pub const VISION_FLOW: &str = "xtls-rprx-vision";
/// Port used by links when no endpoint matches the client tag.
pub const DEFAULT_LINK_PORT: u16 = 443;

// ============================================================================
// Reconcile Defaults
// ============================================================================

/// Default timeout for one stats API call in seconds.
pub const DEFAULT_STATS_TIMEOUT_SECS: u64 = 5;
/// Default watch-mode interval in seconds.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
/// Default timeout for a process-control call in seconds.
pub const DEFAULT_CONTROL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Panel Defaults
// ============================================================================

/// File holding the public domain used in connection links.
pub const DEFAULT_DOMAIN_FILE: &str = "/root/domain";
/// Default panel configuration file.
pub const DEFAULT_PANEL_CONFIG_PATH: &str = "/etc/xray/panel.toml";
