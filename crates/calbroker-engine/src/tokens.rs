//! Token lifecycle management.
//!
//! Every calendar operation starts by ensuring the integration holds a
//! usable access token. The flow:
//!
//! 1. Token still fresh: use it, no record write.
//! 2. Stale with no refresh token: mark the integration `expired`, fail.
//! 3. Otherwise exchange the refresh token. On success the new access token,
//!    expiry, and (only if the provider rotated it) refresh token are
//!    persisted and the integration is marked `active`.
//! 4. An `invalid_grant` rejection means the user revoked access: mark
//!    `expired`, fail as auth-expired.
//! 5. Any other refresh failure marks the integration `error` and fails as
//!    refresh-failed, preserving the underlying message.
//!
//! Every outcome that is not "still fresh" writes the integration record, so
//! operators can see integration health without reading logs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use calbroker_providers::{CalendarGateway, CalendarProviderConfig, GatewayErrorCode};

use crate::error::{EngineError, EngineResult};
use crate::integration::{IntegrationRecord, IntegrationStatus, IntegrationStore};

/// Keeps integration access tokens fresh, persisting state transitions.
pub struct TokenLifecycleManager {
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn IntegrationStore>,
}

impl TokenLifecycleManager {
    /// Creates a manager over the given gateway and store.
    pub fn new(gateway: Arc<dyn CalendarGateway>, store: Arc<dyn IntegrationStore>) -> Self {
        Self { gateway, store }
    }

    /// Ensures `record` holds a usable access token, refreshing and
    /// persisting if necessary. Returns the parsed, fresh configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` when no usable refresh token exists or the
    /// grant was revoked, and `AuthRefreshFailed` for other refresh
    /// failures.
    pub async fn ensure_fresh(
        &self,
        record: &mut IntegrationRecord,
        now: DateTime<Utc>,
    ) -> EngineResult<CalendarProviderConfig> {
        let mut config = CalendarProviderConfig::from_value(record.config.clone())
            .map_err(|e| EngineError::Validation(format!("invalid integration configuration: {}", e)))?;

        if config.is_access_token_fresh(now) {
            return Ok(config);
        }

        let Some(refresh_token) = config.refresh_token().map(String::from) else {
            warn!(
                "integration {} has a stale token and no refresh token",
                record.id
            );
            self.mark(record, IntegrationStatus::Expired).await;
            return Err(EngineError::AuthExpired);
        };

        debug!("refreshing access token for integration {}", record.id);
        match self.gateway.refresh_token(refresh_token).await {
            Ok(grant) => {
                config.apply_grant(&grant, now);
                record.config = serde_json::to_value(&config).map_err(|e| {
                    EngineError::Validation(format!("failed to serialize configuration: {}", e))
                })?;
                record.status = IntegrationStatus::Active;
                self.store.update(record.clone()).await?;
                info!("refreshed access token for integration {}", record.id);
                Ok(config)
            }
            Err(e) if e.code() == GatewayErrorCode::AuthenticationFailed => {
                warn!(
                    "refresh token for integration {} was revoked or expired",
                    record.id
                );
                self.mark(record, IntegrationStatus::Expired).await;
                Err(EngineError::AuthExpired)
            }
            Err(e) => {
                warn!("token refresh for integration {} failed: {}", record.id, e);
                self.mark(record, IntegrationStatus::Error).await;
                Err(EngineError::AuthRefreshFailed(e.to_string()))
            }
        }
    }

    /// Persists a status transition; failures are logged, not propagated,
    /// so the original auth error reaches the caller.
    async fn mark(&self, record: &mut IntegrationRecord, status: IntegrationStatus) {
        record.status = status;
        if let Err(e) = self.store.update(record.clone()).await {
            warn!(
                "failed to persist status {} for integration {}: {}",
                status.as_str(),
                record.id,
                e
            );
        }
    }
}
