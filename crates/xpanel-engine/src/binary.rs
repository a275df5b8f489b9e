//! Locating the engine executable.

use std::path::{Path, PathBuf};

use xpanel_core::DEFAULT_ENGINE_BINARIES;

use crate::error::EngineError;

/// Pick the engine binary: the configured path if given, otherwise the
/// first default install location that exists.
pub fn resolve_binary(configured: Option<&Path>) -> Result<PathBuf, EngineError> {
    let defaults: Vec<PathBuf> = DEFAULT_ENGINE_BINARIES.iter().map(PathBuf::from).collect();
    resolve_binary_in(configured, &defaults)
}

/// [`resolve_binary`] over an explicit candidate list.
pub fn resolve_binary_in(
    configured: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<PathBuf, EngineError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| EngineError::BinaryNotFound(candidates.to_vec()))
}
