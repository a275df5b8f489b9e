//! Record storage for xpanel.
//!
//! Clients and inbound endpoints live in two delimiter-separated text files.
//! [`RecordStore`] is the seam the rest of the panel uses; [`FlatFileStore`]
//! is the on-disk backend and [`MemoryStore`] the in-memory one.
//!
//! # Example
//!
//! ```no_run
//! use xpanel_store::{FlatFileStore, RecordStore};
//!
//! # async fn example() -> Result<(), xpanel_store::StoreError> {
//! let store = FlatFileStore::new("/etc/xray/clients.db", "/etc/xray/inbounds.db");
//! let loaded = store.list_clients().await?;
//! for issue in &loaded.issues {
//!     eprintln!("{issue}");
//! }
//! # Ok(())
//! # }
//! ```

mod atomic;
pub mod codec;
mod error;
mod file;
mod loaded;
mod memory;
mod records;
mod traits;

pub use atomic::{read_or_empty, write_atomic};
pub use error::StoreError;
pub use file::FlatFileStore;
pub use loaded::{IssueKind, LineIssue, Loaded};
pub use memory::MemoryStore;
pub use traits::{ClientMutator, RecordStore};
