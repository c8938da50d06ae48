pub mod auth;
pub mod client;
pub mod types;

pub use auth::CredentialStore;
pub use client::SheetsClient;
