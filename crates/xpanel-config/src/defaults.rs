//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `xpanel_core::defaults`.

use xpanel_core::defaults;

/// Generate default value functions that forward to xpanel_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_stats_timeout_secs    => DEFAULT_STATS_TIMEOUT_SECS: u64,
    default_interval_secs         => DEFAULT_RECONCILE_INTERVAL_SECS: u64,
    default_control_timeout_secs  => DEFAULT_CONTROL_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_clients_path      => DEFAULT_CLIENTS_PATH,
    default_inbounds_path     => DEFAULT_INBOUNDS_PATH,
    default_engine_config     => DEFAULT_ENGINE_CONFIG_PATH,
    default_engine_service    => DEFAULT_ENGINE_SERVICE,
    default_cert_file         => DEFAULT_CERT_FILE,
    default_key_file          => DEFAULT_KEY_FILE,
    default_access_log        => DEFAULT_ACCESS_LOG,
    default_error_log         => DEFAULT_ERROR_LOG,
    default_engine_log_level  => DEFAULT_ENGINE_LOG_LEVEL,
    default_domain_file       => DEFAULT_DOMAIN_FILE,
}
