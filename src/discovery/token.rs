//! Access token resolution
//!
//! A configured access token is used as-is. Otherwise a refresh token is
//! exchanged at the OAuth token endpoint. Tokens are not cached here; a
//! [`super::ServiceHandle`] binds the token it was built with.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::shared_resources::global_http_client;
use super::{DiscoveryError, DiscoveryResult};

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// OAuth credentials; empty strings count as absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    /// Pre-issued access token
    pub access_token: Option<String>,
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Long-lived refresh token
    pub refresh_token: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Credentials {
    /// Credentials carrying a pre-issued token
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Credentials for a refresh-token exchange
    pub fn with_refresh_token(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: None,
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Pre-issued token, if configured
    pub fn access_token(&self) -> Option<&str> {
        present(&self.access_token)
    }

    /// Overlay non-empty values from `other`
    pub fn merge(&mut self, other: Credentials) {
        for (slot, value) in [
            (&mut self.access_token, other.access_token),
            (&mut self.client_id, other.client_id),
            (&mut self.client_secret, other.client_secret),
            (&mut self.refresh_token, other.refresh_token),
        ] {
            if present(&value).is_some() {
                *slot = value;
            }
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Resolves bearer tokens
#[derive(Clone)]
pub struct TokenProvider {
    client: Arc<Client>,
    token_endpoint: String,
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::new(global_http_client(), DEFAULT_TOKEN_ENDPOINT)
    }
}

impl TokenProvider {
    /// Create a provider against a specific token endpoint
    pub fn new(client: Arc<Client>, token_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            token_endpoint: token_endpoint.into(),
        }
    }

    /// Token endpoint in use
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Return the configured token, or exchange the refresh token for one
    ///
    /// # Errors
    /// [`DiscoveryError::Auth`] with the raw response body on a non-2xx status,
    /// or when the credentials cannot produce a token at all.
    pub async fn get_access_token(&self, credentials: &Credentials) -> DiscoveryResult<String> {
        if let Some(token) = credentials.access_token() {
            debug!("Using pre-issued access token");
            return Ok(token.to_string());
        }

        let (client_id, client_secret, refresh_token) = match (
            present(&credentials.client_id),
            present(&credentials.client_secret),
            present(&credentials.refresh_token),
        ) {
            (Some(id), Some(secret), Some(refresh)) => (id, secret, refresh),
            _ => {
                return Err(DiscoveryError::Auth(
                    "no access token configured and refresh credentials are incomplete".to_string(),
                ))
            }
        };

        info!(endpoint = %self.token_endpoint, "Exchanging refresh token for access token");

        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.client.post(&self.token_endpoint).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DiscoveryError::Auth(body));
        }

        serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty())
            .ok_or(DiscoveryError::Auth(body))
    }
}
