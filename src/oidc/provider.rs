//! Identity provider collaborator
//!
//! The authorization-code exchange against the provider's token endpoint.
//! The core engine only consumes the resulting access token string; this
//! client is boundary plumbing.

use crate::config::Config;
use crate::error::GateError;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Token endpoint response for the authorization-code grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token
    pub access_token: String,
    /// Refresh token, when the provider issues one
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// HTTP client for the provider's OIDC endpoints.
pub struct ProviderClient {
    http_client: reqwest::Client,
    token_url: String,
    logout_url: String,
    client_id: String,
    redirect_uri: String,
}

impl ProviderClient {
    /// Creates a provider client from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, GateError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| GateError::Internal(anyhow::anyhow!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_url: config.token_url(),
            logout_url: config.logout_url(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.to_string(),
        })
    }

    /// The provider's logout endpoint URL.
    #[must_use]
    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// A non-2xx response or unreadable body is a provider fault, reported
    /// as [`GateError::ProviderUnavailable`], never as a token failure.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GateError> {
        debug!(url = %self.token_url, "exchanging authorization code");

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GateError::ProviderUnavailable {
                reason: if e.is_timeout() {
                    "token endpoint timed out".to_string()
                } else {
                    "token endpoint unreachable".to_string()
                },
            })?;

        if !response.status().is_success() {
            return Err(GateError::ProviderUnavailable {
                reason: format!("token endpoint returned {}", response.status()),
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|_| GateError::ProviderUnavailable {
                reason: "malformed token endpoint response".to_string(),
            })
    }
}
