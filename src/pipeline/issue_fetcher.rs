use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::issue_analyzer::{IssueAnalyzer, IssueRecord};
use super::project_window::ProjectWindow;
use crate::error::SyncError;
use crate::github::client::GitHubClient;
use crate::github::types::RateLimitState;

#[derive(Debug)]
pub struct FetcherConfig {
    pub window: ProjectWindow,
    pub skip_pull_requests: bool,
}

#[derive(Debug)]
pub struct FetchOutcome {
    /// Ascending by issue number, one record per number.
    pub records: Vec<IssueRecord>,
    pub pages: u32,
    pub issues_seen: usize,
    pub last_rate_limit: RateLimitState,
}

pub struct IssueFetcher {
    client: GitHubClient,
    config: FetcherConfig,
}

impl IssueFetcher {
    pub fn new(client: GitHubClient, config: FetcherConfig) -> Self {
        Self { client, config }
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, SyncError> {
        let mut records: BTreeMap<u64, IssueRecord> = BTreeMap::new();
        let mut issues_seen = 0;
        let mut page = 1;

        info!(
            repository = %self.client.repository(),
            per_page = self.client.per_page(),
            "Fetching issues"
        );

        let last_rate_limit = loop {
            let current = self.client.list_issues(page).await?;
            let rate_limit = current.rate_limit;

            // No total count in the API, an empty page is the only end marker
            if current.issues.is_empty() {
                break rate_limit;
            }

            issues_seen += current.issues.len();
            for issue in &current.issues {
                if self.config.skip_pull_requests && issue.is_pull_request() {
                    continue;
                }

                let timestamps = IssueAnalyzer::timestamps(issue)?;
                if !self.config.window.contains(&timestamps) {
                    continue;
                }

                // Pages can shift while paginating; keep the first copy
                records
                    .entry(issue.number)
                    .or_insert_with(|| IssueAnalyzer::analyze(issue, &timestamps));
            }

            info!(page, total = records.len(), rate_limit = %rate_limit, "Processed issue page");

            Self::wait_for_rate_limit(&rate_limit).await;
            page += 1;
        };

        Ok(FetchOutcome {
            records: records.into_values().collect(),
            pages: page,
            issues_seen,
            last_rate_limit,
        })
    }

    async fn wait_for_rate_limit(rate_limit: &RateLimitState) {
        if !rate_limit.is_exhausted() {
            return;
        }

        match (rate_limit.backoff(Utc::now()), rate_limit.reset) {
            (Some(delay), Some(reset)) => {
                println!("{}", sleep_notice(reset));
                info!(seconds = delay.as_secs(), "Rate limit reached, waiting for reset");
                tokio::time::sleep(delay).await;
            }
            _ => warn!(remaining = rate_limit.remaining, "Rate limit reached but no reset time was sent"),
        }
    }
}

/// Reset instant in the operator's local time, matching the completion line.
fn sleep_notice(reset: DateTime<Utc>) -> String {
    format!("Sleeping until {}", reset.with_timezone(&Local).format("%d.%m.%Y, %H:%M:%S"))
}
