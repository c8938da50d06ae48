use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SyncError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub project: ProjectConfig,
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub org: String,
    pub repo: String,
    pub per_page: u32,
    pub timeout_secs: u64,
    pub skip_pull_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// File holding the project start instant; absent file means no window
    pub start_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_url: String,
    pub spreadsheet_id_file: PathBuf,
    pub range: String,
    pub token_file: PathBuf,
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_url: "https://api.github.com".to_string(),
            org: "Gamify-IT".to_string(),
            repo: "issues".to_string(),
            per_page: 100,
            timeout_secs: 10,
            skip_pull_requests: false,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            start_file: PathBuf::from("project_start.txt"),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        SheetsConfig {
            api_url: "https://sheets.googleapis.com".to_string(),
            spreadsheet_id_file: PathBuf::from("spreadsheet_id.txt"),
            range: "Issues!A2:F".to_string(),
            token_file: PathBuf::from("token.json"),
            timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = super::read_required(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SyncError> {
        let config: Config =
            toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))?;

        if config.github.per_page == 0 || config.github.per_page > 100 {
            return Err(SyncError::Config(format!(
                "github.per_page must be between 1 and 100, got {}",
                config.github.per_page
            )));
        }

        Ok(config)
    }
}
