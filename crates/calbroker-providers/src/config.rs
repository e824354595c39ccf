//! Provider configuration stored on an integration record.
//!
//! Integration records carry a JSON configuration blob describing which
//! provider they bind to and the credentials for it. This module parses and
//! validates that blob once, so the rest of the engine works with typed
//! fields instead of raw JSON lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::TokenGrant;

/// The calendar used when a config does not name one.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Seconds before nominal expiry at which an access token is treated as
/// stale, to absorb clock skew and request latency.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// OAuth application credentials (per deployment, not per integration).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAppCredentials {
    /// The OAuth client ID.
    pub client_id: String,
    /// The OAuth client secret.
    pub client_secret: String,
}

impl OAuthAppCredentials {
    /// Creates new credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// The provider-specific portion of an integration's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "camelCase")]
pub enum CalendarProviderConfig {
    /// Google Calendar.
    #[serde(rename = "google")]
    Google(GoogleCalendarConfig),
}

impl CalendarProviderConfig {
    /// Parses and validates a configuration blob.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` coded error when the blob is missing,
    /// names an unknown provider, or lacks an access token.
    pub fn from_value(value: serde_json::Value) -> GatewayResult<Self> {
        let config: Self = serde_json::from_value(value).map_err(|e| {
            GatewayError::configuration(format!("invalid provider configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GatewayResult<()> {
        match self {
            Self::Google(google) => {
                if google.access_token.trim().is_empty() {
                    return Err(GatewayError::configuration(
                        "google configuration has no access token",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the provider name for this configuration.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Google(_) => "google",
        }
    }

    /// Returns the Google configuration, if this is a Google integration.
    pub fn as_google(&self) -> Option<&GoogleCalendarConfig> {
        match self {
            Self::Google(google) => Some(google),
        }
    }

    /// Returns the calendar to operate on.
    pub fn calendar_id(&self) -> &str {
        match self {
            Self::Google(google) => google.calendar_id.as_str(),
        }
    }

    /// Returns the current access token.
    pub fn access_token(&self) -> &str {
        match self {
            Self::Google(google) => google.access_token.as_str(),
        }
    }

    /// Returns the refresh token, if one was granted.
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Self::Google(google) => google.refresh_token.as_deref(),
        }
    }

    /// Returns the configured concurrency ceiling, if any.
    pub fn max_concurrent_appointments(&self) -> Option<u32> {
        match self {
            Self::Google(google) => google.max_concurrent_appointments,
        }
    }

    /// Returns the integration's default timezone, if one is configured.
    pub fn time_zone(&self) -> Option<&str> {
        match self {
            Self::Google(google) => google.time_zone.as_deref(),
        }
    }

    /// Returns true if the stored access token is still usable at `now`.
    ///
    /// A token with no recorded expiry is treated as stale, forcing a
    /// refresh before use.
    pub fn is_access_token_fresh(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Google(google) => google.is_access_token_fresh(now),
        }
    }

    /// Applies a refresh grant to this configuration.
    ///
    /// The previous refresh token is kept when the grant did not rotate it.
    pub fn apply_grant(&mut self, grant: &TokenGrant, now: DateTime<Utc>) {
        match self {
            Self::Google(google) => google.apply_grant(grant, now),
        }
    }
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

/// Google Calendar credentials and settings for one integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCalendarConfig {
    /// The current OAuth access token.
    pub access_token: String,

    /// The OAuth refresh token. Absent when the user never granted offline
    /// access, in which case expiry is unrecoverable without re-auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// The granted OAuth scope string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// The calendar to operate on.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// Default IANA timezone for events on this integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// How many appointments may overlap any instant. Unset means the
    /// engine default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_appointments: Option<u32>,
}

impl GoogleCalendarConfig {
    /// Creates a config with just an access token, using defaults elsewhere.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            scope: None,
            calendar_id: default_calendar_id(),
            time_zone: None,
            max_concurrent_appointments: None,
        }
    }

    /// Returns true if the access token is still usable at `now`.
    pub fn is_access_token_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                now.timestamp_millis() + EXPIRY_SKEW_SECONDS * 1000 < expires_at
            }
            None => false,
        }
    }

    /// Applies a refresh grant, keeping the old refresh token when the
    /// provider did not rotate it.
    pub fn apply_grant(&mut self, grant: &TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token.clone();
        if let Some(ref rotated) = grant.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
        self.expires_at = grant
            .expires_in
            .map(|seconds| now.timestamp_millis() + seconds * 1000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, 10, 0, 0).unwrap()
    }

    #[test]
    fn parses_google_config() {
        let config = CalendarProviderConfig::from_value(serde_json::json!({
            "provider": "google",
            "accessToken": "ya29.token",
            "refreshToken": "1//refresh",
            "expiresAt": 1760000000000i64,
            "calendarId": "work@example.com",
            "maxConcurrentAppointments": 2
        }))
        .unwrap();

        assert_eq!(config.provider_name(), "google");
        assert_eq!(config.calendar_id(), "work@example.com");
        assert_eq!(config.refresh_token(), Some("1//refresh"));
        assert_eq!(config.max_concurrent_appointments(), Some(2));
    }

    #[test]
    fn calendar_defaults_to_primary() {
        let config = CalendarProviderConfig::from_value(serde_json::json!({
            "provider": "google",
            "accessToken": "ya29.token"
        }))
        .unwrap();

        assert_eq!(config.calendar_id(), DEFAULT_CALENDAR_ID);
        assert!(config.max_concurrent_appointments().is_none());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = CalendarProviderConfig::from_value(serde_json::json!({
            "provider": "outlook",
            "accessToken": "token"
        }))
        .unwrap_err();

        assert_eq!(err.code(), crate::error::GatewayErrorCode::ConfigurationError);
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let err = CalendarProviderConfig::from_value(serde_json::json!({
            "provider": "google",
            "accessToken": "  "
        }))
        .unwrap_err();

        assert!(err.message().contains("no access token"));
    }

    #[test]
    fn token_with_no_expiry_is_stale() {
        let config = GoogleCalendarConfig::new("token");
        assert!(!config.is_access_token_fresh(now()));
    }

    #[test]
    fn token_freshness_respects_skew() {
        let mut config = GoogleCalendarConfig::new("token");

        config.expires_at = Some(now().timestamp_millis() + 3_600_000);
        assert!(config.is_access_token_fresh(now()));

        // Expiring within the skew window counts as stale.
        config.expires_at = Some(now().timestamp_millis() + 30_000);
        assert!(!config.is_access_token_fresh(now()));
    }

    #[test]
    fn apply_grant_keeps_old_refresh_token() {
        let mut config = GoogleCalendarConfig::new("old-access");
        config.refresh_token = Some("old-refresh".to_string());

        config.apply_grant(
            &TokenGrant {
                access_token: "new-access".to_string(),
                refresh_token: None,
                expires_in: Some(3600),
            },
            now(),
        );

        assert_eq!(config.access_token, "new-access");
        assert_eq!(config.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(
            config.expires_at,
            Some(now().timestamp_millis() + 3_600_000)
        );
    }

    #[test]
    fn apply_grant_stores_rotated_refresh_token() {
        let mut config = GoogleCalendarConfig::new("old-access");
        config.refresh_token = Some("old-refresh".to_string());

        config.apply_grant(
            &TokenGrant {
                access_token: "new-access".to_string(),
                refresh_token: Some("new-refresh".to_string()),
                expires_in: None,
            },
            now(),
        );

        assert_eq!(config.refresh_token.as_deref(), Some("new-refresh"));
        assert!(config.expires_at.is_none());
    }
}
