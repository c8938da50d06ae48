pub mod issue_analyzer;
pub mod issue_fetcher;
pub mod project_window;
pub mod report;

pub use issue_analyzer::{DodStatus, IssueRecord};
pub use issue_fetcher::{FetchOutcome, FetcherConfig, IssueFetcher};
pub use project_window::ProjectWindow;
