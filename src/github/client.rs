use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use std::time::Duration;
use tracing::debug;

use super::types::{IssuePage, RateLimitState, RawIssue};
use crate::config::types::GithubConfig;
use crate::error::SyncError;

const API_VERSION: &str = "application/vnd.github.v3+json";
const AGENT: &str = concat!("issue-sheet-sync/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    org: String,
    repo: String,
    token: Option<String>,
    per_page: u32,
}

impl GitHubClient {
    pub fn new(config: &GithubConfig, token: Option<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::GitHub(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            org: config.org.clone(),
            repo: config.repo.clone(),
            token: token.filter(|t| !t.is_empty()),
            per_page: config.per_page,
        })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetches one page of issues in every state.
    pub async fn list_issues(&self, page: u32) -> Result<IssuePage, SyncError> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, self.org, self.repo);

        let mut request = self
            .client
            .get(&url)
            .query(&[
                ("state", "all".to_string()),
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .header(ACCEPT, API_VERSION)
            .header(USER_AGENT, AGENT);
        if let Some(ref token) = self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::GitHub(format!("GET {} page {}: {}", url, page, e)))?;

        let rate_limit = RateLimitState::from_headers(response.headers());
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(SyncError::GitHub(format!(
                "GET {} page {} returned {}: {}",
                url, page, status, text
            )));
        }

        let issues: Vec<RawIssue> = response
            .json()
            .await
            .map_err(|e| SyncError::GitHub(format!("malformed issue page {}: {}", page, e)))?;

        debug!(page, count = issues.len(), remaining = rate_limit.remaining, "Fetched issue page");

        Ok(IssuePage { issues, rate_limit })
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("org", &self.org)
            .field("repo", &self.repo)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}
