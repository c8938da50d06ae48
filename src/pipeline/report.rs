use serde::{Deserialize, Serialize};

use super::issue_analyzer::IssueRecord;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" | "text" => Ok(OutputFormat::Table),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub struct ReportGenerator {
    format: OutputFormat,
}

impl ReportGenerator {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn generate(&self, records: &[IssueRecord]) -> Result<String, SyncError> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(records)
                .map_err(|e| SyncError::Config(format!("failed to serialize records: {}", e))),
            OutputFormat::Table => Ok(Self::generate_table(records)),
        }
    }

    fn generate_table(records: &[IssueRecord]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>6}  {:>4}  {:<10}  {:<10}  {:<5}  {}\n",
            "issue", "sp", "created", "closed", "bug", "dod"
        ));

        for record in records {
            output.push_str(&format!(
                "{:>6}  {:>4}  {:<10}  {:<10}  {:<5}  {}\n",
                record.number,
                record.storypoints.map(|p| p.to_string()).unwrap_or_default(),
                record.created_at.map(|d| d.to_string()).unwrap_or_default(),
                record.closed_at.map(|d| d.to_string()).unwrap_or_default(),
                record.is_bug,
                record.dod_fulfilled,
            ));
        }

        output
    }
}
