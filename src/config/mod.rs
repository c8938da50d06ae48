pub mod types;

pub use types::Config;

use std::io::ErrorKind;
use std::path::Path;

use crate::error::SyncError;

/// Reads a plain-text input file, trimming surrounding whitespace.
pub fn read_required(path: &Path) -> Result<String, SyncError> {
    read_optional(path)?.ok_or_else(|| SyncError::MissingFile(path.to_path_buf()))
}

/// Like [`read_required`], but a missing file is `Ok(None)`.
pub fn read_optional(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SyncError::FileAccess {
            path: path.to_path_buf(),
            source,
        }),
    }
}
