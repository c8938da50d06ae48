pub mod client;
pub mod rate_limit;
pub mod types;

pub use client::GitHubClient;
