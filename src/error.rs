use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("GitHub request failed: {0}")]
    GitHub(String),

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("Google authorization required: {0}")]
    Authorization(String),

    #[error("spreadsheet update failed: {0}")]
    SheetsUpdate(String),
}

impl SyncError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::MissingFile(_) | SyncError::FileAccess { .. } => -1,
            SyncError::SheetsUpdate(_) => -2,
            _ => 1,
        }
    }
}
