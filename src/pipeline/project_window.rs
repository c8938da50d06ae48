use chrono::NaiveDateTime;
use std::path::Path;
use tracing::info;

use super::issue_analyzer::{parse_timestamp, IssueTimestamps};
use crate::config;
use crate::error::SyncError;

/// Cutoff separating the current project's issues from older ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectWindow {
    start: Option<NaiveDateTime>,
}

impl ProjectWindow {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self { start: Some(start) }
    }

    /// Reads the start instant from `path`. A missing or empty file gives an
    /// open window.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        match config::read_optional(path)? {
            Some(content) if !content.is_empty() => {
                let start = parse_timestamp(&content)?;
                info!(start = %start, "Project window configured");
                Ok(Self::starting_at(start))
            }
            _ => {
                info!(path = %path.display(), "No project start configured, including all issues");
                Ok(Self::open())
            }
        }
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn contains(&self, timestamps: &IssueTimestamps) -> bool {
        match self.start {
            None => true,
            Some(start) => timestamps.iter().any(|t| t >= start),
        }
    }
}
