//! Engine configuration synthesis.
//!
//! [`render`] turns client and endpoint records into the complete Xray
//! configuration document. [`Synthesizer`] loads the records from a
//! [`RecordStore`](xpanel_store::RecordStore), renders them and replaces the
//! config file atomically.

pub mod document;
mod error;
mod render;
mod sync;

pub use document::EngineDocument;
pub use error::SyncError;
pub use render::{Orphan, RenderSettings, Rendered, render};
pub use sync::Synthesizer;
