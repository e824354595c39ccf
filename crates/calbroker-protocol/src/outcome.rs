//! Outbound tool-call outcomes.

use serde::{Deserialize, Serialize};

use calbroker_core::{Attendee, Attribution, BookedEvent, EventTime};

/// Error codes surfaced to the chat pipeline and adjacent HTTP layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Integration or event does not exist.
    NotFound,
    /// Integration exists but is not a calendar integration.
    WrongIntegrationType,
    /// Integration is not active.
    IntegrationInactive,
    /// No usable refresh token; a human must re-authenticate.
    AuthExpired,
    /// Token refresh failed for a transient reason.
    AuthRefreshFailed,
    /// Requester may not mutate this event.
    PermissionDenied,
    /// The requested window is already at its concurrency ceiling.
    SlotUnavailable,
    /// The requester already holds an active booking.
    DuplicateActiveBooking,
    /// The event changed underneath the update (ETag mismatch).
    ConcurrentModification,
    /// The availability query failed; the slot cannot be assumed free.
    AvailabilityCheckFailed,
    /// Malformed input.
    ValidationError,
    /// Any other provider or internal failure.
    ProviderError,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::WrongIntegrationType => "wrong_integration_type",
            Self::IntegrationInactive => "integration_inactive",
            Self::AuthExpired => "auth_expired",
            Self::AuthRefreshFailed => "auth_refresh_failed",
            Self::PermissionDenied => "permission_denied",
            Self::SlotUnavailable => "slot_unavailable",
            Self::DuplicateActiveBooking => "duplicate_active_booking",
            Self::ConcurrentModification => "concurrent_modification",
            Self::AvailabilityCheckFailed => "availability_check_failed",
            Self::ValidationError => "validation_error",
            Self::ProviderError => "provider_error",
        }
    }

    /// Returns the HTTP status the adjacent routing layer should use.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::WrongIntegrationType | Self::IntegrationInactive | Self::ValidationError => 400,
            Self::AuthExpired | Self::AuthRefreshFailed => 401,
            Self::PermissionDenied => 403,
            Self::SlotUnavailable | Self::DuplicateActiveBooking => 409,
            Self::ConcurrentModification => 412,
            Self::AvailabilityCheckFailed | Self::ProviderError => 500,
        }
    }

    /// Returns `true` if the caller can recover by picking another time.
    pub fn is_reschedulable(&self) -> bool {
        matches!(self, Self::SlotUnavailable | Self::DuplicateActiveBooking)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The normalized event fields returned on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    /// Provider event id.
    pub id: String,
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Start time.
    pub start: EventTime,
    /// End time.
    pub end: EventTime,
    /// Link to the event in the provider's UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    /// Video-call link, if one was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    /// Attendees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    /// Attribution sub-fields, surfaced for caller display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<Attribution>,
}

impl From<BookedEvent> for EventResult {
    fn from(event: BookedEvent) -> Self {
        Self {
            id: event.id,
            summary: event.summary,
            start: event.start,
            end: event.end,
            html_link: event.html_link,
            hangout_link: event.hangout_link,
            attendees: event.attendees,
            booked_by: event.attribution,
        }
    }
}

/// The outcome returned to the chat pipeline for every tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Human-readable message suitable for relaying through chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The affected event, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,

    /// Multiple events, for the read actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventResult>>,

    /// Error code, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,

    /// Structured details (existing booking times, counts, markers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Set when the requested window is full.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requested_slot_unavailable: bool,

    /// Set when the requester already holds an active booking.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub user_already_has_appointment: bool,
}

impl Outcome {
    /// Creates a success outcome with a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            result: None,
            events: None,
            error: None,
            details: None,
            requested_slot_unavailable: false,
            user_already_has_appointment: false,
        }
    }

    /// Creates a failure outcome with a code and message.
    pub fn failure(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            result: None,
            events: None,
            error: Some(error),
            details: None,
            requested_slot_unavailable: error == ErrorCode::SlotUnavailable,
            user_already_has_appointment: error == ErrorCode::DuplicateActiveBooking,
        }
    }

    /// Builder: attach the affected event.
    pub fn with_result(mut self, result: EventResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Builder: attach a list of events.
    pub fn with_events(mut self, events: Vec<EventResult>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builder: attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns the HTTP status for this outcome.
    pub fn http_status(&self) -> u16 {
        match self.error {
            None => 200,
            Some(code) => code.http_status(),
        }
    }
}
