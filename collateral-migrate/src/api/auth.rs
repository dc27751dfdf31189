//! OAuth2 client-credentials authentication for the catalog API

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credentials for the client-credentials grant
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

/// Cached access token
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Fetches and caches access tokens
#[derive(Debug)]
pub struct AuthManager {
    http: reqwest::Client,
    credentials: CredentialSet,
    token: Mutex<Option<TokenInfo>>,
}

impl AuthManager {
    pub fn new(http: reqwest::Client, credentials: CredentialSet) -> Self {
        Self {
            http,
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, requesting a new one when the cached one is stale
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
            log::debug!("Catalog access token expired, refreshing");
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    async fn request_token(&self) -> Result<TokenInfo> {
        let url = format!(
            "{}/oauth/token",
            self.credentials.auth_url.trim_end_matches('/')
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.credentials.scope.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("Failed to reach token endpoint {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token request failed with {}: {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        log::info!(
            "Authenticated against catalog API (client {}, expires in {}s)",
            self.credentials.client_id,
            token.expires_in
        );

        Ok(TokenInfo {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
