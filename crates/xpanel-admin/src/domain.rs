//! Public domain used in connection links.

use std::path::Path;

use tracing::debug;
use xpanel_config::PanelConfig;

/// Fallback when neither the config, the domain file nor the hostname help.
const LAST_RESORT: &str = "localhost";

/// Configured domain, else the first non-empty content of the domain file,
/// else the machine hostname.
pub async fn resolve_domain(panel: &PanelConfig) -> String {
    if let Some(domain) = panel.domain.as_deref().map(str::trim)
        && !domain.is_empty()
    {
        return domain.to_string();
    }
    if let Some(domain) = read_domain_file(Path::new(&panel.domain_file)).await {
        return domain;
    }
    sysinfo::System::host_name()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| LAST_RESORT.to_string())
}

async fn read_domain_file(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let domain = text.trim();
            (!domain.is_empty()).then(|| domain.to_string())
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "domain file not readable");
            None
        }
    }
}
