use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::pipeline::IssueRecord;

const COLUMNS: usize = 6;

/// Body of `spreadsheets.values.update`, and the response of `values.get`
/// (which omits `values` for an empty range).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueRange {
    pub range: String,
    pub major_dimension: String,
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    pub fn rows(range: &str, records: &[IssueRecord]) -> Self {
        ValueRange {
            range: range.to_string(),
            major_dimension: "ROWS".to_string(),
            values: records.iter().map(record_row).collect(),
        }
    }

    /// Appends blank rows until there are at least `rows`, so a shorter
    /// result still overwrites every row written by an earlier run.
    pub fn pad_to(&mut self, rows: usize) {
        while self.values.len() < rows {
            self.values.push(vec![json!(""); COLUMNS]);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSummary {
    pub spreadsheet_id: String,
    pub updated_range: Option<String>,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
}

/// `[number, storypoints, created_at, closed_at, is_bug, dod_fulfilled]`.
/// Missing values become empty strings so stale cells are overwritten.
fn record_row(record: &IssueRecord) -> Vec<Value> {
    vec![
        json!(record.number),
        record.storypoints.map(|p| json!(p)).unwrap_or_else(|| json!("")),
        json!(record.created_at.map(|d| d.to_string()).unwrap_or_default()),
        json!(record.closed_at.map(|d| d.to_string()).unwrap_or_default()),
        json!(record.is_bug),
        json!(record.dod_fulfilled.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DodStatus;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_keep_record_order_and_column_layout() {
        let records = vec![
            IssueRecord {
                number: 2,
                storypoints: Some(5),
                created_at: NaiveDate::from_ymd_opt(2023, 4, 1),
                closed_at: NaiveDate::from_ymd_opt(2023, 4, 9),
                is_bug: false,
                dod_fulfilled: DodStatus::Complete,
            },
            IssueRecord {
                number: 10,
                storypoints: None,
                created_at: NaiveDate::from_ymd_opt(2023, 5, 1),
                closed_at: None,
                is_bug: true,
                dod_fulfilled: DodStatus::Partial,
            },
        ];

        let body = ValueRange::rows("Issues!A2:F", &records);

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "range": "Issues!A2:F",
                "majorDimension": "ROWS",
                "values": [
                    [2, 5, "2023-04-01", "2023-04-09", false, "complete"],
                    [10, "", "2023-05-01", "", true, "partial"]
                ]
            })
        );
    }

    #[test]
    fn padding_blanks_rows_left_from_a_longer_run() {
        let mut body = ValueRange::rows("Issues!A2:F", &[]);
        body.pad_to(2);

        assert_eq!(body.values, vec![vec![json!(""); 6], vec![json!(""); 6]]);

        body.pad_to(1);
        assert_eq!(body.values.len(), 2);
    }

    #[test]
    fn empty_range_response_has_no_rows() {
        let existing: ValueRange =
            serde_json::from_str(r#"{"range": "Issues!A2:F1000", "majorDimension": "ROWS"}"#).unwrap();
        assert!(existing.values.is_empty());
    }

    #[test]
    fn summary_tolerates_missing_counters() {
        let summary: UpdateSummary =
            serde_json::from_str(r#"{"spreadsheetId": "abc", "updatedRange": "Issues!A2:F3"}"#).unwrap();
        assert_eq!(summary.spreadsheet_id, "abc");
        assert_eq!(summary.updated_rows, 0);
    }
}
