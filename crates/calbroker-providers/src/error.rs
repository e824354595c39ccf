//! Error types for calendar gateway operations.
//!
//! This module defines the error types that can occur when talking to an
//! external calendar provider (Google Calendar today).

use std::fmt;
use thiserror::Error;

/// The category of a gateway error.
///
/// This enum provides a high-level classification of errors for use in
/// engine decisions and retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorCode {
    /// Authentication failed - credentials are invalid, expired, or revoked.
    AuthenticationFailed,
    /// Authorization failed - the account lacks permission.
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Resource existed but has been deleted (410).
    Gone,
    /// The request conflicts with current resource state (409).
    Conflict,
    /// A conditional request failed its precondition (412, ETag mismatch).
    PreconditionFailed,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal gateway error - unexpected state, bug.
    InternalError,
}

impl GatewayErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true if the resource is known to be absent (deleted or never
    /// existed).
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound | Self::Gone)
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::Conflict => "conflict",
            Self::PreconditionFailed => "precondition_failed",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a calendar provider.
#[derive(Debug, Error)]
pub struct GatewayError {
    /// The error code categorizing this error.
    code: GatewayErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GatewayError {
    /// Creates a new gateway error with the given code and message.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NotFound, message)
    }

    /// Creates a gone error.
    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Gone, message)
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Conflict, message)
    }

    /// Creates a precondition-failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::PreconditionFailed, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InternalError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> GatewayErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(GatewayErrorCode::NetworkError.is_retryable());
        assert!(GatewayErrorCode::RateLimited.is_retryable());
        assert!(GatewayErrorCode::ServerError.is_retryable());
        assert!(!GatewayErrorCode::AuthenticationFailed.is_retryable());
        assert!(!GatewayErrorCode::NotFound.is_retryable());
        assert!(!GatewayErrorCode::PreconditionFailed.is_retryable());
    }

    #[test]
    fn error_code_absent() {
        assert!(GatewayErrorCode::NotFound.is_absent());
        assert!(GatewayErrorCode::Gone.is_absent());
        assert!(!GatewayErrorCode::Conflict.is_absent());
    }

    #[test]
    fn error_code_display() {
        assert_eq!(
            GatewayErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(
            GatewayErrorCode::PreconditionFailed.as_str(),
            "precondition_failed"
        );
    }

    #[test]
    fn gateway_error_creation() {
        let err = GatewayError::authentication("token expired");
        assert_eq!(err.code(), GatewayErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token expired");
        assert!(err.provider().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn gateway_error_with_provider() {
        let err = GatewayError::network("connection timeout").with_provider("google");
        assert_eq!(err.code(), GatewayErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("google"));
        assert!(err.is_retryable());
    }

    #[test]
    fn gateway_error_display() {
        let err = GatewayError::gone("event was deleted").with_provider("google");
        let display = format!("{}", err);
        assert!(display.contains("[google]"));
        assert!(display.contains("gone"));
        assert!(display.contains("event was deleted"));
    }

    #[test]
    fn gateway_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = GatewayError::network("request failed").with_source(io_err);
        assert!(err.source().is_some());
    }
}
