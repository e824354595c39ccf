//! CalendarGateway trait definition.
//!
//! This module defines the [`CalendarGateway`] trait, the abstraction the
//! booking engine talks through to reach an external calendar provider.
//!
//! Gateways are responsible for:
//! - Translating normalized requests into provider API calls
//! - Mapping provider HTTP statuses onto [`GatewayError`] codes
//! - Normalizing provider events into [`BookedEvent`] values
//!
//! Gateways are deliberately stateless with respect to credentials: the
//! caller supplies a fresh access token on every call, so token lifecycle
//! decisions stay in the engine.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use calbroker_core::{Attendee, BookedEvent, EventTime};

use crate::error::{GatewayError, GatewayResult};

/// A boxed future for async trait methods.
///
/// This is used because async functions in traits are not yet stable in a way
/// that works well with dynamic dispatch. Using boxed futures allows the trait
/// to be object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-call credentials and calendar selection.
#[derive(Debug, Clone)]
pub struct CalendarContext {
    /// A currently valid access token.
    pub access_token: String,
    /// The provider calendar identifier (e.g., "primary").
    pub calendar_id: String,
}

impl CalendarContext {
    /// Creates a new calendar context.
    pub fn new(access_token: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            calendar_id: calendar_id.into(),
        }
    }
}

/// Query parameters for listing events.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Lower bound for event end time.
    pub time_min: DateTime<Utc>,
    /// Upper bound for event start time.
    pub time_max: DateTime<Utc>,
    /// Maximum number of events to return.
    pub max_results: Option<usize>,
    /// Whether to expand recurring events into instances.
    pub single_events: bool,
    /// Filter to events carrying this private extended property, as a
    /// `key=value` pair.
    pub private_property: Option<(String, String)>,
}

impl ListQuery {
    /// Creates a query over the given window, expanding recurring events.
    pub fn new(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max,
            max_results: None,
            single_events: true,
            private_property: None,
        }
    }

    /// Builder method to set max results.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Builder method to filter by a private extended property.
    pub fn with_private_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.private_property = Some((key.into(), value.into()));
        self
    }
}

/// The event fields sent to the provider on insert and update.
///
/// For updates this is a full replacement body; the engine is responsible
/// for merging caller-supplied fields into the existing event first.
#[derive(Debug, Clone)]
pub struct EventPayload {
    /// Event title.
    pub summary: Option<String>,
    /// Event description.
    pub description: Option<String>,
    /// Event location.
    pub location: Option<String>,
    /// Start time.
    pub start: EventTime,
    /// End time.
    pub end: EventTime,
    /// IANA timezone to render the times in, when known.
    pub time_zone: Option<String>,
    /// Attendees to invite.
    pub attendees: Vec<Attendee>,
    /// Private extended properties (ownership attribution lives here).
    pub private_properties: HashMap<String, String>,
    /// Provider-shaped reminder overrides, passed through verbatim.
    pub reminders: Option<serde_json::Value>,
    /// Whether to request a video conference on the event.
    pub create_conference: bool,
    /// Attendee notification routing ("all", "none", "externalOnly").
    pub send_notifications: Option<String>,
}

impl EventPayload {
    /// Creates a payload with the given times and no other fields.
    pub fn new(start: EventTime, end: EventTime) -> Self {
        Self {
            summary: None,
            description: None,
            location: None,
            start,
            end,
            time_zone: None,
            attendees: Vec::new(),
            private_properties: HashMap::new(),
            reminders: None,
            create_conference: false,
            send_notifications: None,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the private properties.
    pub fn with_private_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.private_properties = properties;
        self
    }
}

/// Tokens returned by a refresh grant.
///
/// `refresh_token` is only present when the provider rotated it; callers
/// must keep their previous refresh token otherwise.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// A rotated refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<i64>,
}

/// A calendar visible to the authenticated account.
#[derive(Debug, Clone)]
pub struct CalendarListing {
    /// The calendar identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this is the account's primary calendar.
    pub is_primary: bool,
    /// The calendar timezone (IANA identifier).
    pub timezone: Option<String>,
}

/// The abstraction for external calendar providers.
///
/// All operations take credentials per call and return normalized
/// [`BookedEvent`] values. Implementations must be `Send + Sync` so a single
/// gateway can serve concurrent tool calls.
pub trait CalendarGateway: Send + Sync {
    /// Returns the name of this provider (e.g., "google").
    fn name(&self) -> &str;

    /// Lists events overlapping the query window.
    ///
    /// Implementations handle pagination internally and must not return
    /// cancelled events.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on network errors, authentication failures, etc.
    fn list_events(
        &self,
        context: CalendarContext,
        query: ListQuery,
    ) -> BoxFuture<'_, GatewayResult<Vec<BookedEvent>>>;

    /// Fetches a single event by id.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` or `Gone` coded error when the event is absent.
    fn get_event(
        &self,
        context: CalendarContext,
        event_id: String,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>>;

    /// Creates a new event and returns the provider's view of it.
    fn insert_event(
        &self,
        context: CalendarContext,
        payload: EventPayload,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>>;

    /// Replaces an existing event's body.
    ///
    /// When `if_match` is set the update is conditional on the event's ETag;
    /// a mismatch surfaces as a `PreconditionFailed` coded error.
    fn update_event(
        &self,
        context: CalendarContext,
        event_id: String,
        payload: EventPayload,
        if_match: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>>;

    /// Deletes an event.
    ///
    /// Absence (`NotFound`/`Gone`) is surfaced as an error; the engine
    /// decides whether that counts as success.
    fn delete_event(
        &self,
        context: CalendarContext,
        event_id: String,
        send_notifications: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<()>>;

    /// Lists calendars visible to the authenticated account.
    fn list_calendars(
        &self,
        access_token: String,
    ) -> BoxFuture<'_, GatewayResult<Vec<CalendarListing>>>;

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns an `AuthenticationFailed` coded error when the refresh token
    /// has been revoked or expired, and other codes for transient failures.
    fn refresh_token(&self, refresh_token: String) -> BoxFuture<'_, GatewayResult<TokenGrant>>;

    /// Revokes a token (access or refresh) at the provider.
    ///
    /// Tokens that are already invalid count as revoked.
    fn revoke_token(&self, token: String) -> BoxFuture<'_, GatewayResult<()>>;
}

/// A gateway that always returns an error.
///
/// Useful for testing or as a placeholder when a gateway fails to
/// initialize.
#[derive(Debug)]
pub struct ErrorGateway {
    name: String,
    error: GatewayError,
}

impl ErrorGateway {
    /// Creates a new error gateway.
    pub fn new(name: impl Into<String>, error: GatewayError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn error(&self) -> GatewayError {
        GatewayError::new(self.error.code(), self.error.message()).with_provider(&self.name)
    }
}

impl CalendarGateway for ErrorGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events(
        &self,
        _context: CalendarContext,
        _query: ListQuery,
    ) -> BoxFuture<'_, GatewayResult<Vec<BookedEvent>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn get_event(
        &self,
        _context: CalendarContext,
        _event_id: String,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn insert_event(
        &self,
        _context: CalendarContext,
        _payload: EventPayload,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn update_event(
        &self,
        _context: CalendarContext,
        _event_id: String,
        _payload: EventPayload,
        _if_match: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn delete_event(
        &self,
        _context: CalendarContext,
        _event_id: String,
        _send_notifications: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn list_calendars(
        &self,
        _access_token: String,
    ) -> BoxFuture<'_, GatewayResult<Vec<CalendarListing>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn refresh_token(&self, _refresh_token: String) -> BoxFuture<'_, GatewayResult<TokenGrant>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn revoke_token(&self, _token: String) -> BoxFuture<'_, GatewayResult<()>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayErrorCode;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 12, h, m, 0).unwrap()
    }

    #[test]
    fn list_query_builder() {
        let query = ListQuery::new(utc(9, 0), utc(18, 0))
            .with_max_results(50)
            .with_private_property("bookedByUserId", "+15551230000");

        assert_eq!(query.max_results, Some(50));
        assert!(query.single_events);
        assert_eq!(
            query.private_property,
            Some(("bookedByUserId".to_string(), "+15551230000".to_string()))
        );
    }

    #[test]
    fn event_payload_builder() {
        let payload = EventPayload::new(
            EventTime::from_utc(utc(10, 0)),
            EventTime::from_utc(utc(10, 30)),
        )
        .with_summary("Appointment for Ada");

        assert_eq!(payload.summary.as_deref(), Some("Appointment for Ada"));
        assert!(payload.attendees.is_empty());
        assert!(!payload.create_conference);
    }

    #[tokio::test]
    async fn error_gateway_returns_error() {
        let gateway = ErrorGateway::new("test", GatewayError::configuration("not configured"));

        assert_eq!(gateway.name(), "test");

        let result = gateway
            .get_event(CalendarContext::new("tok", "primary"), "evt-1".to_string())
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.code(), GatewayErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("test"));

        let result = gateway.refresh_token("refresh".to_string()).await;
        assert!(result.is_err());
    }
}
