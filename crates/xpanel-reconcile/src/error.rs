//! Reconciler error types.

use xpanel_engine::EngineError;
use xpanel_render::SyncError;
use xpanel_store::StoreError;

/// Reconciler error type.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("sync: {0}")]
    Sync(#[from] SyncError),

    #[error("engine: {0}")]
    Engine(#[from] EngineError),
}
