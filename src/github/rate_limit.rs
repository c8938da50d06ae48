use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;

use super::types::RateLimitState;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// At or below this many remaining calls the fetcher waits for the reset.
pub const LOW_WATERMARK: u64 = 1;

// Used when the server omits the remaining header, keeps us above the watermark.
const DEFAULT_REMAINING: u64 = LOW_WATERMARK + 1;

impl RateLimitState {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        RateLimitState {
            remaining: header_u64(headers, REMAINING_HEADER).unwrap_or(DEFAULT_REMAINING),
            limit: header_u64(headers, LIMIT_HEADER),
            reset: header_u64(headers, RESET_HEADER)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= LOW_WATERMARK
    }

    /// How long to wait before the next request, `None` when no wait is needed
    /// or the reset instant is unknown.
    pub fn backoff(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_exhausted() {
            return None;
        }
        let reset = self.reset?;
        Some((reset - now).to_std().unwrap_or(Duration::ZERO))
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
