//! Shared in-memory fakes for engine tests.

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use calbroker_core::{Attribution, BookedEvent, ChannelIdentity, EventTime, TimeWindow};
use calbroker_providers::{
    BoxFuture, CalendarContext, CalendarGateway, CalendarListing, EventPayload, GatewayError,
    GatewayErrorCode, GatewayResult, ListQuery, TokenGrant,
};

use crate::integration::{IntegrationRecord, IntegrationStatus, INTEGRATION_TYPE_CALENDAR};

/// The fixed instant engine tests run at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap()
}

/// A UTC instant on the test day.
pub fn utc(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 12, h, m, 0).unwrap()
}

/// A timed event on the test day.
pub fn event(id: &str, start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> BookedEvent {
    BookedEvent::new(
        id,
        EventTime::from_utc(utc(start_h, start_m)),
        EventTime::from_utc(utc(end_h, end_m)),
    )
}

/// A timed event attributed to the given raw identity.
pub fn attributed_event(
    id: &str,
    start_h: u32,
    start_m: u32,
    end_h: u32,
    end_m: u32,
    user: &str,
) -> BookedEvent {
    let mut e = event(id, start_h, start_m, end_h, end_m);
    e.summary = Some(format!("Appointment {}", id));
    e.attribution = Some(Attribution::new(ChannelIdentity::normalize(user)));
    e
}

/// A usable calendar integration with a token fresh until the afternoon.
pub fn google_record(id: &str) -> IntegrationRecord {
    let created = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    IntegrationRecord {
        id: id.to_string(),
        agent_id: "agent-1".to_string(),
        name: "Salon calendar".to_string(),
        integration_type: INTEGRATION_TYPE_CALENDAR.to_string(),
        config: serde_json::json!({
            "provider": "google",
            "accessToken": "fresh-access",
            "refreshToken": "refresh-1",
            "expiresAt": utc(15, 0).timestamp_millis(),
        }),
        status: IntegrationStatus::Active,
        is_active: true,
        created_by: None,
        created_at: created,
        updated_at: created,
    }
}

/// How the fake answers a refresh request.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// Return this grant.
    Grant(TokenGrant),
    /// Reject as a revoked/expired grant.
    InvalidGrant,
    /// Fail with a server error.
    ServerFailure,
}

impl Default for RefreshBehavior {
    fn default() -> Self {
        Self::Grant(TokenGrant {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }
}

/// An in-memory [`CalendarGateway`] with scriptable failures.
#[derive(Debug, Default)]
pub struct FakeGateway {
    /// Events visible to list/get.
    pub events: Mutex<Vec<BookedEvent>>,
    /// When set, list_events fails with this code.
    pub list_failure: Mutex<Option<GatewayErrorCode>>,
    /// When set, delete_event fails with this code.
    pub delete_failure: Mutex<Option<GatewayErrorCode>>,
    /// When set, update_event fails with this code.
    pub update_failure: Mutex<Option<GatewayErrorCode>>,
    /// How refresh_token answers.
    pub refresh: Mutex<RefreshBehavior>,
    /// Payloads passed to insert_event.
    pub inserted: Mutex<Vec<EventPayload>>,
    /// Event ids passed to delete_event.
    pub deleted: Mutex<Vec<String>>,
    /// Tokens passed to revoke_token.
    pub revoked: Mutex<Vec<String>>,
    /// Number of refresh_token calls.
    pub refresh_calls: Mutex<u32>,
    /// Number of calendar API calls (everything but refresh/revoke).
    pub calendar_calls: Mutex<u32>,
}

impl FakeGateway {
    /// Creates an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the visible events.
    pub fn with_events(self, events: Vec<BookedEvent>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    /// Scripts the refresh behavior.
    pub fn with_refresh(self, behavior: RefreshBehavior) -> Self {
        *self.refresh.lock().unwrap() = behavior;
        self
    }

    fn count_calendar_call(&self) {
        *self.calendar_calls.lock().unwrap() += 1;
    }

    fn fail_with(code: GatewayErrorCode) -> GatewayError {
        GatewayError::new(code, "scripted failure").with_provider("fake")
    }
}

impl CalendarGateway for FakeGateway {
    fn name(&self) -> &str {
        "fake"
    }

    fn list_events(
        &self,
        _context: CalendarContext,
        query: ListQuery,
    ) -> BoxFuture<'_, GatewayResult<Vec<BookedEvent>>> {
        self.count_calendar_call();
        if let Some(code) = *self.list_failure.lock().unwrap() {
            return Box::pin(async move { Err(Self::fail_with(code)) });
        }

        let window = TimeWindow::new(query.time_min, query.time_max);
        let matches: Vec<BookedEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| window.overlaps(&e.start, &e.end))
            .filter(|e| match query.private_property {
                Some((ref key, ref value)) => e
                    .attribution
                    .as_ref()
                    .map(Attribution::to_properties)
                    .is_some_and(|props| props.get(key) == Some(value)),
                None => true,
            })
            .cloned()
            .collect();

        Box::pin(async move { Ok(matches) })
    }

    fn get_event(
        &self,
        _context: CalendarContext,
        event_id: String,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        self.count_calendar_call();
        let found = self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == event_id)
            .cloned();
        Box::pin(async move {
            found.ok_or_else(|| GatewayError::not_found(format!("event {} not found", event_id)))
        })
    }

    fn insert_event(
        &self,
        _context: CalendarContext,
        payload: EventPayload,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        self.count_calendar_call();
        let mut created = BookedEvent::new("created-evt", payload.start, payload.end);
        created.summary = payload.summary.clone();
        created.description = payload.description.clone();
        created.location = payload.location.clone();
        created.attendees = payload.attendees.clone();
        created.reminders = payload.reminders.clone();
        created.attribution = Attribution::from_properties(&payload.private_properties);
        created.etag = Some("\"1\"".to_string());

        self.inserted.lock().unwrap().push(payload);
        self.events.lock().unwrap().push(created.clone());
        Box::pin(async move { Ok(created) })
    }

    fn update_event(
        &self,
        _context: CalendarContext,
        event_id: String,
        payload: EventPayload,
        _if_match: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        self.count_calendar_call();
        if let Some(code) = *self.update_failure.lock().unwrap() {
            return Box::pin(async move { Err(Self::fail_with(code)) });
        }

        let mut updated = BookedEvent::new(event_id, payload.start, payload.end);
        updated.summary = payload.summary.clone();
        updated.description = payload.description.clone();
        updated.location = payload.location.clone();
        updated.attendees = payload.attendees.clone();
        updated.reminders = payload.reminders.clone();
        updated.attribution = Attribution::from_properties(&payload.private_properties);
        updated.etag = Some("\"2\"".to_string());

        let mut events = self.events.lock().unwrap();
        if let Some(stored) = events.iter_mut().find(|e| e.id == updated.id) {
            *stored = updated.clone();
        }
        drop(events);

        Box::pin(async move { Ok(updated) })
    }

    fn delete_event(
        &self,
        _context: CalendarContext,
        event_id: String,
        _send_notifications: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        self.count_calendar_call();
        if let Some(code) = *self.delete_failure.lock().unwrap() {
            return Box::pin(async move { Err(Self::fail_with(code)) });
        }

        self.deleted.lock().unwrap().push(event_id.clone());
        self.events.lock().unwrap().retain(|e| e.id != event_id);
        Box::pin(async move { Ok(()) })
    }

    fn list_calendars(
        &self,
        _access_token: String,
    ) -> BoxFuture<'_, GatewayResult<Vec<CalendarListing>>> {
        self.count_calendar_call();
        Box::pin(async move {
            Ok(vec![CalendarListing {
                id: "primary".to_string(),
                name: "Primary".to_string(),
                is_primary: true,
                timezone: Some("UTC".to_string()),
            }])
        })
    }

    fn refresh_token(&self, _refresh_token: String) -> BoxFuture<'_, GatewayResult<TokenGrant>> {
        *self.refresh_calls.lock().unwrap() += 1;
        let behavior = self.refresh.lock().unwrap().clone();
        Box::pin(async move {
            match behavior {
                RefreshBehavior::Grant(grant) => Ok(grant),
                RefreshBehavior::InvalidGrant => Err(GatewayError::authentication(
                    "refresh token has been revoked or expired (invalid_grant)",
                )),
                RefreshBehavior::ServerFailure => {
                    Err(GatewayError::server("token endpoint unavailable"))
                }
            }
        })
    }

    fn revoke_token(&self, token: String) -> BoxFuture<'_, GatewayResult<()>> {
        self.revoked.lock().unwrap().push(token);
        Box::pin(async move { Ok(()) })
    }
}
