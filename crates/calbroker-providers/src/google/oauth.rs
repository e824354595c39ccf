//! OAuth 2.0 token refresh and revocation for Google APIs.
//!
//! Integrations are connected through a consent flow that lives elsewhere;
//! by the time this crate sees an integration it already holds an access
//! token and (usually) a refresh token. This module covers the two flows
//! the booking engine needs at runtime:
//!
//! - Exchanging the refresh token for a new access token
//! - Revoking tokens when an integration is disconnected
//!
//! A refresh rejected with `invalid_grant` means the user revoked access or
//! the grant expired; that is surfaced as an authentication error so the
//! caller can distinguish "re-auth required" from transient failures.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OAuthAppCredentials;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::TokenGrant;

/// Google OAuth endpoints.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthAppCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` coded error if the HTTP client cannot
    /// be constructed.
    pub fn new(credentials: OAuthAppCredentials, timeout: Duration) -> GatewayResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns an `AuthenticationFailed` coded error when the grant has been
    /// revoked or expired (`invalid_grant`), a `ServerError` for 5xx
    /// responses, and a `NetworkError` when the request itself fails.
    pub async fn refresh(&self, refresh_token: &str) -> GatewayResult<TokenGrant> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_refresh_failure(status, &body));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("invalid token response: {}", e))
        })?;

        info!("refreshed google access token");
        Ok(TokenGrant {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_in: token_response.expires_in,
        })
    }

    /// Revokes a token (access or refresh) at the provider.
    ///
    /// Google answers 400 for tokens that are already invalid; that is
    /// treated as success since the end state is the same.
    pub async fn revoke(&self, token: &str) -> GatewayResult<()> {
        let response = self
            .http_client
            .post(GOOGLE_REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("token revoke request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::BAD_REQUEST {
            debug!("revoked google token (status {})", status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::server(format!(
            "token revoke failed ({}): {}",
            status, body
        )))
    }
}

/// Classifies a non-success token-endpoint response.
fn classify_refresh_failure(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let oauth_error = serde_json::from_str::<OAuthErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);

    if oauth_error.as_deref() == Some("invalid_grant") {
        return GatewayError::authentication(
            "refresh token has been revoked or expired (invalid_grant)",
        );
    }

    if status.is_server_error() {
        return GatewayError::server(format!("token refresh failed ({}): {}", status, body));
    }

    GatewayError::bad_request(format!("token refresh failed ({}): {}", status, body))
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    #[serde(default)]
    error: Option<String>,
}
