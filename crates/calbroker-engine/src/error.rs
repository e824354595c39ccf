//! Engine error taxonomy and its mapping onto protocol outcomes.

use thiserror::Error;

use calbroker_core::BookedEvent;
use calbroker_protocol::{ErrorCode, Outcome};
use calbroker_providers::{GatewayError, GatewayErrorCode};

use crate::integration::StoreError;

/// Errors a booking operation can end in.
///
/// Each variant maps onto one protocol [`ErrorCode`], which in turn carries
/// the HTTP status adjacent layers use.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The integration or event does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The integration exists but is not a calendar integration.
    #[error("integration {id} is a {integration_type} integration, not a calendar")]
    WrongIntegrationType {
        /// The integration id.
        id: String,
        /// The type tag actually stored.
        integration_type: String,
    },

    /// The integration is not active.
    #[error("integration {0} is not active")]
    IntegrationInactive(String),

    /// No usable credentials; the integration must be reconnected.
    #[error("calendar authorization has expired; the integration must be reconnected")]
    AuthExpired,

    /// Token refresh failed for a reason other than a revoked grant.
    #[error("token refresh failed: {0}")]
    AuthRefreshFailed(String),

    /// The requester may not perform this operation.
    #[error("{0}")]
    PermissionDenied(String),

    /// The requested window is at its concurrency ceiling.
    #[error("requested time slot is unavailable ({overlapping}/{ceiling} booked)")]
    SlotUnavailable {
        /// Events already overlapping the requested window.
        overlapping: u32,
        /// The configured ceiling.
        ceiling: u32,
    },

    /// The requester already holds an active booking.
    #[error("requester already has an active booking")]
    DuplicateActiveBooking {
        /// The booking that blocks this one.
        existing: Box<BookedEvent>,
    },

    /// The event changed between read and write.
    #[error("the appointment was modified concurrently; please retry")]
    ConcurrentModification,

    /// The provider itself rejected the write as conflicting.
    #[error("the calendar provider rejected this booking as conflicting: {0}")]
    ProviderConflict(String),

    /// The availability query failed; the slot cannot be assumed free.
    #[error("could not verify slot availability: {0}")]
    AvailabilityCheckFailed(String),

    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// The integration store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other provider failure.
    #[error("calendar provider error: {0}")]
    Provider(GatewayError),
}

impl EngineError {
    /// Returns the protocol error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::WrongIntegrationType { .. } => ErrorCode::WrongIntegrationType,
            Self::IntegrationInactive(_) => ErrorCode::IntegrationInactive,
            Self::AuthExpired => ErrorCode::AuthExpired,
            Self::AuthRefreshFailed(_) => ErrorCode::AuthRefreshFailed,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::SlotUnavailable { .. } | Self::ProviderConflict(_) => ErrorCode::SlotUnavailable,
            Self::DuplicateActiveBooking { .. } => ErrorCode::DuplicateActiveBooking,
            Self::ConcurrentModification => ErrorCode::ConcurrentModification,
            Self::AvailabilityCheckFailed(_) => ErrorCode::AvailabilityCheckFailed,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Store(_) | Self::Provider(_) => ErrorCode::ProviderError,
        }
    }

    /// Converts this error into the outcome relayed to the chat pipeline.
    pub fn into_outcome(self) -> Outcome {
        let code = self.error_code();
        match self {
            Self::SlotUnavailable {
                overlapping,
                ceiling,
            } => {
                let message = if ceiling == 1 {
                    "That time slot is already occupied. Please pick another time.".to_string()
                } else {
                    format!(
                        "That time window is fully booked ({} of {} slots taken). \
                         Please pick another time.",
                        overlapping, ceiling
                    )
                };
                Outcome::failure(code, message).with_details(serde_json::json!({
                    "overlappingEvents": overlapping,
                    "maxConcurrentAppointments": ceiling,
                }))
            }
            Self::DuplicateActiveBooking { existing } => {
                let summary = existing.summary.clone().unwrap_or_default();
                let message = format!(
                    "You already have an upcoming appointment{}. \
                     Please cancel it before booking a new one.",
                    if summary.is_empty() {
                        String::new()
                    } else {
                        format!(" (\"{}\")", summary)
                    }
                );
                Outcome::failure(code, message).with_details(serde_json::json!({
                    "existingEventId": existing.id,
                    "existingSummary": existing.summary,
                    "existingStart": existing.start,
                    "existingEnd": existing.end,
                }))
            }
            other => {
                let message = other.to_string();
                Outcome::failure(code, message)
            }
        }
    }
}

impl From<GatewayError> for EngineError {
    /// Maps a gateway error onto the engine taxonomy.
    ///
    /// Absence codes become `NotFound`, a provider 403 becomes a
    /// provider-level permission denial, an ETag mismatch becomes
    /// `ConcurrentModification`, and a provider 409 becomes a conflict the
    /// caller can reschedule around. Anything else stays a provider error.
    fn from(error: GatewayError) -> Self {
        match error.code() {
            GatewayErrorCode::AuthenticationFailed => Self::AuthExpired,
            GatewayErrorCode::AuthorizationFailed => Self::PermissionDenied(
                "the calendar provider denied access to this event".to_string(),
            ),
            GatewayErrorCode::NotFound | GatewayErrorCode::Gone => {
                Self::NotFound("event".to_string())
            }
            GatewayErrorCode::PreconditionFailed => Self::ConcurrentModification,
            GatewayErrorCode::Conflict => Self::ProviderConflict(error.message().to_string()),
            _ => Self::Provider(error),
        }
    }
}

/// A specialized Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
