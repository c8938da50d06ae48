use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue as returned by the REST issue list endpoint. Only the fields the
/// sync reads are modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
    pub body: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub closed_at: Option<String>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLabel {
    pub name: String,
}

/// Rate limit headers of a single response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: u64,
    pub limit: Option<u64>,
    pub reset: Option<DateTime<Utc>>,
}

impl fmt::Display for RateLimitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}/{} requests remaining", self.remaining, limit)?,
            None => write!(f, "{} requests remaining", self.remaining)?,
        }
        if let Some(reset) = self.reset {
            write!(f, ", resets at {}", reset.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IssuePage {
    pub issues: Vec<RawIssue>,
    pub rate_limit: RateLimitState,
}
