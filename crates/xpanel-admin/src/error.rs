//! Admin operation errors.

use xpanel_core::Protocol;
use xpanel_engine::EngineError;
use xpanel_render::SyncError;
use xpanel_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("client {0} already exists")]
    DuplicateUsername(String),

    #[error("no inbound with tag {0}")]
    UnknownEndpoint(String),

    #[error("{0} is not supported, use ws or grpc for vmess")]
    UnsupportedProtocol(Protocol),

    #[error("client {username} has unusable protocol tag {tag:?}")]
    NoLink { username: String, tag: String },
}

impl AdminError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// True when the request itself was rejected before touching storage.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::Invalid { .. }
                | Self::DuplicateUsername(_)
                | Self::UnknownEndpoint(_)
                | Self::UnsupportedProtocol(_)
        )
    }
}
