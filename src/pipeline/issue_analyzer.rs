use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::SyncError;
use crate::github::types::{RawIssue, RawLabel};

/// Definition-of-done completion derived from the checklist in an issue body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DodStatus {
    Complete,
    Partial,
    None,
}

impl fmt::Display for DodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DodStatus::Complete => write!(f, "complete"),
            DodStatus::Partial => write!(f, "partial"),
            DodStatus::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub storypoints: Option<u32>,
    pub created_at: Option<NaiveDate>,
    pub closed_at: Option<NaiveDate>,
    pub is_bug: bool,
    pub dod_fulfilled: DodStatus,
}

/// Parsed source timestamps of one issue, UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueTimestamps {
    pub created: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    pub closed: Option<NaiveDateTime>,
}

impl IssueTimestamps {
    pub fn iter(&self) -> impl Iterator<Item = NaiveDateTime> {
        [self.created, self.updated, self.closed].into_iter().flatten()
    }
}

pub struct IssueAnalyzer;

impl IssueAnalyzer {
    pub fn timestamps(issue: &RawIssue) -> Result<IssueTimestamps, SyncError> {
        Ok(IssueTimestamps {
            created: parse_optional(issue.created_at.as_deref())?,
            updated: parse_optional(issue.updated_at.as_deref())?,
            closed: parse_optional(issue.closed_at.as_deref())?,
        })
    }

    pub fn analyze(issue: &RawIssue, timestamps: &IssueTimestamps) -> IssueRecord {
        IssueRecord {
            number: issue.number,
            storypoints: Self::storypoints(&issue.labels),
            created_at: timestamps.created.map(|t| t.date()),
            closed_at: timestamps.closed.map(|t| t.date()),
            is_bug: Self::is_bug(&issue.labels),
            dod_fulfilled: Self::dod_status(issue.body.as_deref()),
        }
    }

    /// First `storypoint/<n>` label in API order wins.
    pub fn storypoints(labels: &[RawLabel]) -> Option<u32> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^\s*storypoint/(\d+)\s*$").expect("storypoint pattern is valid")
        });

        labels.iter().find_map(|label| {
            re.captures(&label.name)
                .and_then(|cap| cap.get(1))
                .and_then(|points| points.as_str().parse().ok())
        })
    }

    pub fn is_bug(labels: &[RawLabel]) -> bool {
        labels.iter().any(|label| label.name.trim() == "bug")
    }

    pub fn dod_status(body: Option<&str>) -> DodStatus {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(?m)^\s*- \[([ xX])\]").expect("checklist pattern is valid")
        });

        let (mut open, mut closed) = (0usize, 0usize);
        for cap in re.captures_iter(body.unwrap_or("")) {
            if &cap[1] == " " {
                open += 1;
            } else {
                closed += 1;
            }
        }

        match (open, closed) {
            (0, _) => DodStatus::Complete,
            (_, 0) => DodStatus::None,
            _ => DodStatus::Partial,
        }
    }
}

/// Parses an ISO-8601 instant as sent by the API (`2023-04-01T12:00:00Z`).
/// Offsets other than `Z` are converted to UTC; a bare date means midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, SyncError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }

    let stripped = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }

    NaiveDate::parse_from_str(stripped, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SyncError::Timestamp(value.to_string()))
}

fn parse_optional(value: Option<&str>) -> Result<Option<NaiveDateTime>, SyncError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_timestamp(v).map(Some),
        _ => Ok(None),
    }
}
