//! Trakt OAuth: device-code login and token refresh.

use crate::error::SourceError;
use crate::http;
use chrono::{DateTime, Duration, TimeZone, Utc};
use media_retention_config::CredentialStore;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration as StdDuration;
use tracing::{debug, info};

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens are refreshed once they are this close to expiring.
pub const REFRESH_MARGIN_HOURS: i64 = 24;

/// What the user needs to authorize this device on the Trakt website.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `None` for a fixed token from the config file.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenInfo {
    pub fn fixed(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let issued = response
            .created_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or(now);
        Self {
            access_token: response.access_token,
            refresh_token: Some(response.refresh_token).filter(|t| !t.is_empty()),
            expires_at: Some(issued + Duration::seconds(response.expires_in)),
        }
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|expires| now + Duration::hours(REFRESH_MARGIN_HOURS) >= expires)
            .unwrap_or(false)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|expires| now >= expires).unwrap_or(false)
    }

    pub fn load(store: &CredentialStore) -> Option<Self> {
        Some(Self {
            access_token: store.get_trakt_access_token()?.clone(),
            refresh_token: store.get_trakt_refresh_token().cloned(),
            expires_at: store.get_trakt_token_expires(),
        })
    }

    pub fn store(&self, store: &mut CredentialStore) {
        store.clear_trakt();
        store.set_trakt_access_token(self.access_token.clone());
        if let Some(refresh) = &self.refresh_token {
            store.set_trakt_refresh_token(refresh.clone());
        }
        if let Some(expires) = self.expires_at {
            store.set_trakt_token_expires(expires);
        }
    }
}

#[derive(Debug, PartialEq)]
enum PollStatus {
    Authorized,
    Pending,
    SlowDown,
    Failed(&'static str),
}

fn poll_status(status: u16) -> PollStatus {
    match status {
        200 => PollStatus::Authorized,
        400 => PollStatus::Pending,
        429 => PollStatus::SlowDown,
        404 => PollStatus::Failed("invalid device code"),
        409 => PollStatus::Failed("code already used"),
        410 => PollStatus::Failed("code expired"),
        418 => PollStatus::Failed("authorization denied by user"),
        _ => PollStatus::Failed("unexpected response from Trakt"),
    }
}

pub struct TraktAuth {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl TraktAuth {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(&[])?,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url, path))
    }

    pub async fn start_device_auth(&self) -> Result<DeviceCode, SourceError> {
        http::json(
            self.post("/oauth/device/code")
                .json(&json!({ "client_id": self.client_id })),
        )
        .await
    }

    /// Poll until the user approves the code, denies it, or it expires.
    pub async fn wait_for_authorization(&self, code: &DeviceCode) -> Result<TokenInfo, SourceError> {
        let mut interval = StdDuration::from_secs(code.interval.max(1));
        let deadline = tokio::time::Instant::now() + StdDuration::from_secs(code.expires_in);

        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(interval).await;

            let response = self
                .post("/oauth/device/token")
                .json(&json!({
                    "code": code.device_code,
                    "client_id": self.client_id,
                    "client_secret": self.client_secret,
                }))
                .send()
                .await?;

            match poll_status(response.status().as_u16()) {
                PollStatus::Authorized => {
                    let token: TokenResponse = response.json().await?;
                    info!(operation = "trakt_auth", "Trakt device authorized");
                    return Ok(TokenInfo::from_response(token, Utc::now()));
                }
                PollStatus::Pending => debug!("Waiting for Trakt authorization"),
                PollStatus::SlowDown => interval += StdDuration::from_secs(1),
                PollStatus::Failed(reason) => return Err(SourceError::Auth(reason.to_string())),
            }
        }

        Err(SourceError::Auth(
            "device code expired before it was authorized".to_string(),
        ))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, SourceError> {
        let token: TokenResponse = http::json(self.post("/oauth/token").json(&json!({
            "refresh_token": refresh_token,
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "redirect_uri": REDIRECT_URI,
            "grant_type": "refresh_token",
        })))
        .await?;
        Ok(TokenInfo::from_response(token, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_token_expiry_from_created_at() {
        let json = r#"{
            "access_token": "a", "token_type": "bearer", "expires_in": 7776000,
            "refresh_token": "r", "scope": "public", "created_at": 1740830400
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        let token = TokenInfo::from_response(response, now());

        assert_eq!(token.refresh_token.as_deref(), Some("r"));
        assert_eq!(
            token.expires_at,
            Some(Utc.timestamp_opt(1740830400 + 7776000, 0).unwrap())
        );
    }

    #[test]
    fn test_refresh_window() {
        let token = TokenInfo {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: Some(now() + Duration::hours(30)),
        };
        assert!(!token.needs_refresh(now()));
        assert!(token.needs_refresh(now() + Duration::hours(7)));
        assert!(!token.is_expired(now() + Duration::hours(29)));
        assert!(token.is_expired(now() + Duration::hours(30)));

        let fixed = TokenInfo::fixed("a");
        assert!(!fixed.needs_refresh(now() + Duration::days(3650)));
        assert!(!fixed.is_expired(now() + Duration::days(3650)));
    }

    #[test]
    fn test_poll_status_mapping() {
        assert_eq!(poll_status(200), PollStatus::Authorized);
        assert_eq!(poll_status(400), PollStatus::Pending);
        assert_eq!(poll_status(429), PollStatus::SlowDown);
        assert_eq!(poll_status(418), PollStatus::Failed("authorization denied by user"));
        assert!(matches!(poll_status(500), PollStatus::Failed(_)));
    }

    #[test]
    fn test_token_round_trips_through_credential_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        let token = TokenInfo {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: Some(now()),
        };

        let mut store = CredentialStore::new(path.clone());
        token.store(&mut store);
        store.save().unwrap();

        let loaded = TokenInfo::load(&CredentialStore::open(path).unwrap()).unwrap();
        assert_eq!(loaded, token);
    }
}
