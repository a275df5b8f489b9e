use std::path::PathBuf;

use xpanel_store::StoreError;

/// Failure to regenerate the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Records could not be loaded.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The config file could not be replaced. The previous file is intact.
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
