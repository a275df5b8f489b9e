//! Record store error types.

/// Record store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a record file failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// No client record carries the username.
    #[error("client {0:?} not found")]
    NotFound(String),

    /// The port is already taken.
    #[error("port {port} already used by {owner}")]
    Conflict { port: u16, owner: String },

    /// Port 0 cannot be listened on.
    #[error("invalid port {0}")]
    InvalidPort(u16),

    /// A field would break the line format.
    #[error("field {field} contains the record delimiter or a line break")]
    Delimiter { field: &'static str },
}

impl StoreError {
    /// Whether the error came from the filesystem rather than from the records.
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
