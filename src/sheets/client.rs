use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::auth::Credential;
use super::types::{UpdateSummary, ValueRange};
use crate::config::types::SheetsConfig;
use crate::error::SyncError;
use crate::pipeline::IssueRecord;

/// Cells are interpreted as if typed into the sheet, so dates and booleans
/// are coerced by the spreadsheet itself.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

pub struct SheetsClient {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(config: &SheetsConfig, credential: &Credential) -> Result<Self, SyncError> {
        let access_token = credential
            .access_token()
            .ok_or_else(|| SyncError::Authorization("credential has no access token".to_string()))?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::SheetsUpdate(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            access_token,
        })
    }

    /// Overwrites `range` with one row per record, in the given order.
    ///
    /// Rows beyond the records that currently hold data are blanked in the
    /// same request, so the range is replaced by a single update.
    pub async fn write(
        &self,
        records: &[IssueRecord],
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<UpdateSummary, SyncError> {
        let url = self.values_url(spreadsheet_id, range)?;

        let existing_rows = self.existing_rows(url.clone()).await?;
        let mut body = ValueRange::rows(range, records);
        body.pad_to(existing_rows);
        debug!(records = records.len(), existing_rows, "Prepared spreadsheet rows");

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::SheetsUpdate(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, range, "Spreadsheet update rejected");
            return Err(SyncError::SheetsUpdate(format!("{}: {}", status, text)));
        }

        let summary: UpdateSummary = response
            .json()
            .await
            .map_err(|e| SyncError::SheetsUpdate(format!("malformed update response: {}", e)))?;

        info!(
            range = summary.updated_range.as_deref().unwrap_or(range),
            rows = summary.updated_rows,
            cells = summary.updated_cells,
            "Spreadsheet updated"
        );

        Ok(summary)
    }

    /// Number of rows in the range that currently hold any value.
    async fn existing_rows(&self, url: Url) -> Result<usize, SyncError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await
            .map_err(|e| SyncError::SheetsUpdate(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::SheetsUpdate(format!("read {}: {}", status, text)));
        }

        let existing: ValueRange = response
            .json()
            .await
            .map_err(|e| SyncError::SheetsUpdate(format!("malformed range response: {}", e)))?;

        Ok(existing.values.len())
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| SyncError::Config(format!("invalid sheets api_url {}: {}", self.api_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("invalid sheets api_url {}", self.api_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);

        Ok(url)
    }
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DodStatus;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> SheetsClient {
        let config = SheetsConfig {
            api_url: server.url(),
            ..SheetsConfig::default()
        };
        let credential: Credential =
            serde_json::from_str(r#"{"token": "ya29.test", "expiry": null}"#).unwrap();
        SheetsClient::new(&config, &credential).unwrap()
    }

    fn records() -> Vec<IssueRecord> {
        vec![IssueRecord {
            number: 4,
            storypoints: Some(1),
            created_at: NaiveDate::from_ymd_opt(2023, 4, 20),
            closed_at: None,
            is_bug: false,
            dod_fulfilled: DodStatus::None,
        }]
    }

    async fn mock_existing(server: &mut mockito::ServerGuard, values: serde_json::Value) -> mockito::Mock {
        server
            .mock("GET", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer ya29.test")
            .with_body(
                serde_json::json!({
                    "range": "Issues!A2:F1000",
                    "majorDimension": "ROWS",
                    "values": values
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn writes_rows_as_user_entered() {
        let mut server = mockito::Server::new_async().await;
        let _existing = mock_existing(&mut server, serde_json::json!([])).await;
        let mock = server
            .mock("PUT", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::UrlEncoded("valueInputOption".into(), "USER_ENTERED".into()))
            .match_header("authorization", "Bearer ya29.test")
            .match_body(Matcher::Json(serde_json::json!({
                "range": "Issues!A2:F",
                "majorDimension": "ROWS",
                "values": [[4, 1, "2023-04-20", "", false, "none"]]
            })))
            .with_body(r#"{"spreadsheetId": "sheet-123", "updatedRange": "Issues!A2:F2", "updatedRows": 1, "updatedColumns": 6, "updatedCells": 6}"#)
            .create_async()
            .await;

        let summary = client_for(&server)
            .write(&records(), "sheet-123", "Issues!A2:F")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary.updated_rows, 1);
        assert_eq!(summary.updated_cells, 6);
    }

    #[tokio::test]
    async fn shorter_result_blanks_remaining_rows_in_one_update() {
        let mut server = mockito::Server::new_async().await;
        let existing = mock_existing(
            &mut server,
            serde_json::json!([
                ["1", "3", "2023-01-01", "", "FALSE", "complete"],
                ["2", "", "2023-01-02", "", "TRUE", "none"],
                ["3", "5", "2023-01-03", "2023-02-01", "FALSE", "partial"]
            ]),
        )
        .await;
        let update = server
            .mock("PUT", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::UrlEncoded("valueInputOption".into(), "USER_ENTERED".into()))
            .match_body(Matcher::Json(serde_json::json!({
                "range": "Issues!A2:F",
                "majorDimension": "ROWS",
                "values": [
                    [4, 1, "2023-04-20", "", false, "none"],
                    ["", "", "", "", "", ""],
                    ["", "", "", "", "", ""]
                ]
            })))
            .with_body(r#"{"spreadsheetId": "sheet-123", "updatedRange": "Issues!A2:F4", "updatedRows": 3, "updatedColumns": 6, "updatedCells": 18}"#)
            .expect(1)
            .create_async()
            .await;

        let summary = client_for(&server)
            .write(&records(), "sheet-123", "Issues!A2:F")
            .await
            .unwrap();

        existing.assert_async().await;
        update.assert_async().await;
        assert_eq!(summary.updated_rows, 3);
    }

    #[tokio::test]
    async fn rejected_update_maps_to_write_failure() {
        let mut server = mockito::Server::new_async().await;
        let _existing = mock_existing(&mut server, serde_json::json!([])).await;
        let _mock = server
            .mock("PUT", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .write(&records(), "sheet-123", "Issues!A2:F")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SheetsUpdate(_)));
        assert_eq!(err.exit_code(), -2);
    }

    #[tokio::test]
    async fn unreadable_range_aborts_before_any_update() {
        let mut server = mockito::Server::new_async().await;
        let _existing = server
            .mock("GET", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/v4/spreadsheets/sheet-123/values/Issues!A2:F")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client_for(&server)
            .write(&records(), "sheet-123", "Issues!A2:F")
            .await
            .unwrap_err();

        update.assert_async().await;
        assert_eq!(err.exit_code(), -2);
    }
}
