//! Cached OAuth credential for the Sheets API.
//!
//! The credential file uses the "authorized user" JSON layout written by the
//! Google client libraries after the consent flow. Running that consent flow
//! is left to those tools; this module only reuses and refreshes its result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config;
use crate::error::SyncError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Refresh a little early so the token does not expire mid-request.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we don't interpret, written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl Credential {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (Some(token), _) if token.is_empty() => false,
            (Some(_), Some(expiry)) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    async fn refresh(&mut self, http: &reqwest::Client) -> Result<(), SyncError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) =
            (&self.refresh_token, &self.client_id, &self.client_secret)
        else {
            return Err(SyncError::Authorization(
                "credential has no refresh token".to_string(),
            ));
        };

        let response = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Authorization(format!("token refresh failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::Authorization(format!(
                "token refresh returned {}: {}",
                status, text
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Authorization(format!("malformed token response: {}", e)))?;

        self.token = Some(refreshed.access_token);
        self.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(())
    }
}

/// Local file holding the cached [`Credential`].
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Credential, SyncError> {
        let content = config::read_required(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            SyncError::Authorization(format!("unreadable credential {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, credential: &Credential) -> Result<(), SyncError> {
        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| SyncError::Authorization(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|source| SyncError::FileAccess {
            path: self.path.clone(),
            source,
        })
    }

    /// Returns a usable credential, refreshing and persisting it when the
    /// cached access token has expired.
    pub async fn authorize(&self, http: &reqwest::Client) -> Result<Credential, SyncError> {
        let mut credential = self.load()?;

        if credential.is_valid(Utc::now()) {
            debug!(path = %self.path.display(), "Using cached Google credential");
            return Ok(credential);
        }

        if !credential.can_refresh() {
            return Err(SyncError::Authorization(format!(
                "credential in {} is expired and cannot be refreshed; \
                 complete the OAuth consent flow and store the authorized-user token there",
                self.path.display()
            )));
        }

        info!(path = %self.path.display(), "Refreshing expired Google credential");
        credential.refresh(http).await?;
        self.save(&credential)?;
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn credential(expiry: Option<DateTime<Utc>>) -> Credential {
        Credential {
            token: Some("ya29.cached".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: Some("client.apps.googleusercontent.com".to_string()),
            client_secret: Some("shh".to_string()),
            scopes: vec!["https://www.googleapis.com/auth/spreadsheets".to_string()],
            expiry,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn validity_respects_expiry_with_skew() {
        let now = Utc::now();
        assert!(credential(None).is_valid(now));
        assert!(credential(Some(now + Duration::hours(1))).is_valid(now));
        assert!(!credential(Some(now + Duration::seconds(30))).is_valid(now));
        assert!(!credential(Some(now - Duration::hours(1))).is_valid(now));

        let mut missing = credential(None);
        missing.token = None;
        assert!(!missing.is_valid(now));
    }

    #[test]
    fn parses_authorized_user_file() {
        let json = r#"{
            "token": "ya29.abc",
            "refresh_token": "1//xyz",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
            "universe_domain": "googleapis.com",
            "expiry": "2030-01-01T00:00:00.000000Z"
        }"#;

        let parsed: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token(), Some("ya29.abc"));
        assert!(parsed.can_refresh());
        assert_eq!(parsed.extra.get("universe_domain"), Some(&serde_json::json!("googleapis.com")));
    }

    #[tokio::test]
    async fn valid_cache_is_used_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        store.save(&credential(Some(Utc::now() + Duration::hours(1)))).unwrap();

        let authorized = store.authorize(&reqwest::Client::new()).await.unwrap();
        assert_eq!(authorized.access_token(), Some("ya29.cached"));
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
            ]))
            .with_body(r#"{"access_token": "ya29.fresh", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        let mut expired = credential(Some(Utc::now() - Duration::hours(1)));
        expired.token_uri = format!("{}/token", server.url());
        store.save(&expired).unwrap();

        let authorized = store.authorize(&reqwest::Client::new()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(authorized.access_token(), Some("ya29.fresh"));
        assert!(authorized.is_valid(Utc::now()));
        assert_eq!(store.load().unwrap().access_token(), Some("ya29.fresh"));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_needs_consent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        let mut expired = credential(Some(Utc::now() - Duration::hours(1)));
        expired.refresh_token = None;
        store.save(&expired).unwrap();

        let err = store.authorize(&reqwest::Client::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Authorization(_)));
    }

    #[tokio::test]
    async fn missing_credential_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        let err = store.authorize(&reqwest::Client::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), -1);
    }
}
