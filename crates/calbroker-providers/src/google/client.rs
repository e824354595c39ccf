//! Google Calendar API gateway.
//!
//! This module implements [`CalendarGateway`] against the Google Calendar
//! API v3, handling request building, response parsing, and mapping HTTP
//! statuses onto [`GatewayError`] codes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calbroker_core::{Attendee, Attribution, BookedEvent, EventTime};

use crate::config::OAuthAppCredentials;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    BoxFuture, CalendarContext, CalendarGateway, CalendarListing, EventPayload, ListQuery,
    TokenGrant,
};

use super::oauth::OAuthClient;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar gateway.
#[derive(Debug)]
pub struct GoogleCalendarGateway {
    http_client: reqwest::Client,
    oauth: OAuthClient,
}

impl GoogleCalendarGateway {
    /// Creates a new Google Calendar gateway.
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
        let oauth = OAuthClient::new(credentials, timeout)?;

        Ok(Self { http_client, oauth })
    }

    fn events_url(calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            Self::events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    async fn list_events_impl(
        &self,
        context: CalendarContext,
        query: ListQuery,
    ) -> GatewayResult<Vec<BookedEvent>> {
        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(&context, &query, page_token.as_deref())
                .await?;

            for event in page.items {
                if let Some(booked) = convert_event(event) {
                    all_events.push(booked);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }

            if let Some(max) = query.max_results {
                if all_events.len() >= max {
                    all_events.truncate(max);
                    break;
                }
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            all_events.len(),
            context.calendar_id
        );
        Ok(all_events)
    }

    async fn list_events_page(
        &self,
        context: &CalendarContext,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> GatewayResult<EventListResponse> {
        let url = Self::events_url(&context.calendar_id);

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&context.access_token)
            .query(&[
                ("timeMin", query.time_min.to_rfc3339()),
                ("timeMax", query.time_max.to_rfc3339()),
                ("singleEvents", query.single_events.to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(max) = query.max_results {
            request = request.query(&[("maxResults", max.to_string())]);
        }

        if let Some((ref key, ref value)) = query.private_property {
            request = request.query(&[("privateExtendedProperty", format!("{}={}", key, value))]);
        }

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.to_string())]);
        }

        let response = request.send().await.map_err(request_error)?;
        let body = read_success(response).await?;

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::invalid_response(format!("failed to parse response: {}", e)))
    }

    async fn get_event_impl(
        &self,
        context: CalendarContext,
        event_id: String,
    ) -> GatewayResult<BookedEvent> {
        let url = Self::event_url(&context.calendar_id, &event_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&context.access_token)
            .send()
            .await
            .map_err(request_error)?;
        let body = read_success(response).await?;

        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse event: {}", e))
        })?;

        convert_event(event)
            .ok_or_else(|| GatewayError::gone(format!("event {} is cancelled", event_id)))
    }

    async fn insert_event_impl(
        &self,
        context: CalendarContext,
        payload: EventPayload,
    ) -> GatewayResult<BookedEvent> {
        let url = Self::events_url(&context.calendar_id);
        let create_conference = payload.create_conference;
        let send_notifications = payload.send_notifications.clone();
        let body = WriteEvent::from_payload(payload);

        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(&context.access_token)
            .json(&body);

        if create_conference {
            request = request.query(&[("conferenceDataVersion", "1")]);
        }
        if let Some(ref send) = send_notifications {
            request = request.query(&[("sendUpdates", send.as_str())]);
        }

        let response = request.send().await.map_err(request_error)?;
        let body = read_success(response).await?;

        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse created event: {}", e))
        })?;

        convert_event(event)
            .ok_or_else(|| GatewayError::invalid_response("created event came back cancelled"))
    }

    async fn update_event_impl(
        &self,
        context: CalendarContext,
        event_id: String,
        payload: EventPayload,
        if_match: Option<String>,
    ) -> GatewayResult<BookedEvent> {
        let url = Self::event_url(&context.calendar_id, &event_id);
        let send_notifications = payload.send_notifications.clone();
        let body = WriteEvent::from_payload(payload);

        let mut request = self
            .http_client
            .put(&url)
            .bearer_auth(&context.access_token)
            .json(&body);

        if let Some(ref etag) = if_match {
            request = request.header("If-Match", etag);
        }
        if let Some(ref send) = send_notifications {
            request = request.query(&[("sendUpdates", send.as_str())]);
        }

        let response = request.send().await.map_err(request_error)?;
        let body = read_success(response).await?;

        let event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse updated event: {}", e))
        })?;

        convert_event(event)
            .ok_or_else(|| GatewayError::gone(format!("event {} is cancelled", event_id)))
    }

    async fn delete_event_impl(
        &self,
        context: CalendarContext,
        event_id: String,
        send_notifications: Option<String>,
    ) -> GatewayResult<()> {
        let url = Self::event_url(&context.calendar_id, &event_id);

        let mut request = self
            .http_client
            .delete(&url)
            .bearer_auth(&context.access_token);

        if let Some(ref send) = send_notifications {
            request = request.query(&[("sendUpdates", send.as_str())]);
        }

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();

        if status.is_success() {
            debug!("deleted event {}", event_id);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn list_calendars_impl(
        &self,
        access_token: String,
    ) -> GatewayResult<Vec<CalendarListing>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(request_error)?;
        let body = read_success(response).await?;

        let list: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse calendar list: {}", e))
        })?;

        Ok(list
            .items
            .into_iter()
            .map(|entry| CalendarListing {
                id: entry.id,
                name: entry.summary,
                is_primary: entry.primary,
                timezone: entry.time_zone,
            })
            .collect())
    }
}

impl CalendarGateway for GoogleCalendarGateway {
    fn name(&self) -> &str {
        "google"
    }

    fn list_events(
        &self,
        context: CalendarContext,
        query: ListQuery,
    ) -> BoxFuture<'_, GatewayResult<Vec<BookedEvent>>> {
        Box::pin(self.list_events_impl(context, query))
    }

    fn get_event(
        &self,
        context: CalendarContext,
        event_id: String,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        Box::pin(self.get_event_impl(context, event_id))
    }

    fn insert_event(
        &self,
        context: CalendarContext,
        payload: EventPayload,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        Box::pin(self.insert_event_impl(context, payload))
    }

    fn update_event(
        &self,
        context: CalendarContext,
        event_id: String,
        payload: EventPayload,
        if_match: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<BookedEvent>> {
        Box::pin(self.update_event_impl(context, event_id, payload, if_match))
    }

    fn delete_event(
        &self,
        context: CalendarContext,
        event_id: String,
        send_notifications: Option<String>,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(self.delete_event_impl(context, event_id, send_notifications))
    }

    fn list_calendars(
        &self,
        access_token: String,
    ) -> BoxFuture<'_, GatewayResult<Vec<CalendarListing>>> {
        Box::pin(self.list_calendars_impl(access_token))
    }

    fn refresh_token(&self, refresh_token: String) -> BoxFuture<'_, GatewayResult<TokenGrant>> {
        Box::pin(async move { self.oauth.refresh(&refresh_token).await })
    }

    fn revoke_token(&self, token: String) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { self.oauth.revoke(&token).await })
    }
}

/// Maps a transport-level failure onto a gateway error.
fn request_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::network("request timeout")
    } else if e.is_connect() {
        GatewayError::network(format!("connection failed: {}", e))
    } else {
        GatewayError::network(format!("request failed: {}", e))
    }
}

/// Maps a non-success Calendar API status onto a gateway error.
fn classify_status(status: reqwest::StatusCode, body: &str) -> GatewayError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            GatewayError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => GatewayError::authorization("access denied to calendar"),
        reqwest::StatusCode::NOT_FOUND => GatewayError::not_found("event or calendar not found"),
        reqwest::StatusCode::GONE => GatewayError::gone("event has been deleted"),
        reqwest::StatusCode::CONFLICT => GatewayError::conflict("event conflicts with existing state"),
        reqwest::StatusCode::PRECONDITION_FAILED => {
            GatewayError::precondition_failed("event was modified since it was read")
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::rate_limited("rate limit exceeded")
        }
        s if s.is_server_error() => {
            GatewayError::server(format!("API error ({}): {}", status, body))
        }
        _ => GatewayError::bad_request(format!("API error ({}): {}", status, body)),
    }
}

/// Reads a response body, classifying non-success statuses.
async fn read_success(response: reqwest::Response) -> GatewayResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(classify_status(status, &body));
    }

    Ok(body)
}

/// Converts an API event to a [`BookedEvent`], skipping cancelled events.
fn convert_event(event: ApiEvent) -> Option<BookedEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_time(&id, "start", event.start?)?;
    let end = parse_time(&id, "end", event.end?)?;

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            Some(Attendee {
                email: a.email?,
                display_name: a.display_name,
            })
        })
        .collect();

    let attribution = event
        .extended_properties
        .as_ref()
        .and_then(|ep| ep.private.as_ref())
        .and_then(Attribution::from_properties);

    let mut booked = BookedEvent::new(id, start, end);
    booked.summary = event.summary;
    booked.description = event.description;
    booked.location = event.location;
    booked.attendees = attendees;
    booked.reminders = event.reminders;
    booked.attribution = attribution;
    booked.html_link = event.html_link;
    booked.hangout_link = event.hangout_link;
    booked.etag = event.etag;

    Some(booked)
}

fn parse_time(event_id: &str, field: &str, time: ApiEventTime) -> Option<EventTime> {
    match (time.date_time, time.date) {
        (Some(dt), _) => {
            let parsed = DateTime::parse_from_rfc3339(&dt)
                .map_err(|e| warn!("failed to parse {} time of {}: {}", field, event_id, e))
                .ok()?;
            Some(EventTime::from_utc(parsed.with_timezone(&Utc)))
        }
        (None, Some(date)) => {
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| warn!("failed to parse {} date of {}: {}", field, event_id, e))
                .ok()?;
            Some(EventTime::from_date(parsed))
        }
        (None, None) => {
            warn!("event {} has no {} time", event_id, field);
            None
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    html_link: Option<String>,
    hangout_link: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
    reminders: Option<serde_json::Value>,
    extended_properties: Option<ApiExtendedProperties>,
    etag: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    display_name: Option<String>,
}

/// Extended properties from the API.
#[derive(Debug, Deserialize)]
struct ApiExtendedProperties {
    private: Option<HashMap<String, String>>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendarEntry>,
}

/// A calendar from the calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendarEntry {
    id: String,
    summary: String,
    #[serde(default)]
    primary: bool,
    time_zone: Option<String>,
}

/// Request body for event insert and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: WriteEventTime,
    end: WriteEventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<WriteAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extended_properties: Option<WriteExtendedProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminders: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<serde_json::Value>,
}

impl WriteEvent {
    fn from_payload(payload: EventPayload) -> Self {
        let attendees = payload
            .attendees
            .into_iter()
            .map(|a| WriteAttendee {
                email: a.email,
                display_name: a.display_name,
            })
            .collect();

        let extended_properties = if payload.private_properties.is_empty() {
            None
        } else {
            Some(WriteExtendedProperties {
                private: payload.private_properties,
            })
        };

        let conference_data = payload.create_conference.then(|| {
            serde_json::json!({
                "createRequest": {
                    "requestId": format!("calbroker-{}", Utc::now().timestamp_millis()),
                    "conferenceSolutionKey": {"type": "hangoutsMeet"}
                }
            })
        });

        Self {
            summary: payload.summary,
            description: payload.description,
            location: payload.location,
            start: WriteEventTime::from_event_time(&payload.start, payload.time_zone.as_deref()),
            end: WriteEventTime::from_event_time(&payload.end, payload.time_zone.as_deref()),
            attendees,
            extended_properties,
            reminders: payload.reminders,
            conference_data,
        }
    }
}

/// Event time in the write body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl WriteEventTime {
    fn from_event_time(time: &EventTime, time_zone: Option<&str>) -> Self {
        match time {
            EventTime::DateTime(dt) => Self {
                date: None,
                date_time: Some(dt.to_rfc3339()),
                time_zone: time_zone.map(String::from),
            },
            EventTime::AllDay(date) => Self {
                date: Some(date.format("%Y-%m-%d").to_string()),
                date_time: None,
                time_zone: None,
            },
        }
    }
}

/// Attendee in the write body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteAttendee {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

/// Extended properties in the write body.
#[derive(Debug, Serialize)]
struct WriteExtendedProperties {
    private: HashMap<String, String>,
}
