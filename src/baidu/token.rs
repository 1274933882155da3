//! Baidu access token exchange (OAuth 2.0 client credentials)
//!
//! The token is fetched lazily and reused until the process restarts. There is
//! no expiry tracking.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::http::HttpTransport;
use crate::{Error, Result};

/// OAuth token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Extract `access_token` from a token endpoint response
///
/// Returns `None` for unparseable JSON or a missing/non-string field.
#[must_use]
pub fn parse_token_response(body: &str) -> Option<String> {
    serde_json::from_str::<TokenResponse>(body)
        .ok()
        .and_then(|r| r.access_token)
}

/// Shared Baidu access token
pub struct TokenStore {
    http: HttpTransport,
    token_url: String,
    api_key: SecretString,
    secret_key: SecretString,
    token: RwLock<String>,
}

impl TokenStore {
    /// Create an empty store; no request is made until a token is needed
    #[must_use]
    pub fn new(
        http: HttpTransport,
        token_url: String,
        api_key: SecretString,
        secret_key: SecretString,
    ) -> Self {
        Self {
            http,
            token_url,
            api_key,
            secret_key,
            token: RwLock::new(String::new()),
        }
    }

    /// Currently stored token (empty until the first successful refresh)
    pub async fn current(&self) -> String {
        self.token.read().await.clone()
    }

    /// Exchange the client credentials for a fresh token and store it
    ///
    /// On failure the stored token is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a response without `access_token`
    pub async fn refresh(&self) -> Result<String> {
        let response = self
            .http
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", "client_credentials"),
                    ("client_id", self.api_key.expose_secret()),
                    ("client_secret", self.secret_key.expose_secret()),
                ],
            )
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Baidu token request failed");
                Error::Token(e.to_string())
            })?;

        let Some(token) = parse_token_response(&response.into_text()) else {
            tracing::warn!("Baidu token response has no access_token");
            return Err(Error::Token("response has no access_token".to_string()));
        };

        *self.token.write().await = token.clone();
        tracing::info!("refreshed Baidu access token");
        Ok(token)
    }

    /// Return the stored token, refreshing once if it is empty
    ///
    /// # Errors
    ///
    /// Returns error if the token is empty and the refresh fails
    pub async fn ensure(&self) -> Result<String> {
        let token = self.current().await;
        if !token.is_empty() {
            return Ok(token);
        }
        self.refresh().await
    }
}
