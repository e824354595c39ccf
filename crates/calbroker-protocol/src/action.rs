//! Inbound tool-call actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use calbroker_core::EventTime;

/// The operation a tool call requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Book a new appointment.
    CreateEvent,
    /// Modify an existing appointment.
    UpdateEvent,
    /// Cancel an appointment.
    DeleteEvent,
    /// List the requesting user's active bookings.
    GetMyBookedEvents,
    /// List events in a window, regardless of attribution.
    GetEvents,
}

impl ActionKind {
    /// Returns the wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEvent => "createEvent",
            Self::UpdateEvent => "updateEvent",
            Self::DeleteEvent => "deleteEvent",
            Self::GetMyBookedEvents => "getMyBookedEvents",
            Self::GetEvents => "getEvents",
        }
    }

    /// Returns `true` if this action requires an `event_id`.
    pub fn requires_event_id(&self) -> bool {
        matches!(self, Self::UpdateEvent | Self::DeleteEvent)
    }
}

/// How the provider should notify attendees about a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendNotifications {
    /// Notify all attendees.
    All,
    /// Notify nobody.
    None,
    /// Notify only attendees outside the organizer's domain.
    ExternalOnly,
    /// Leave the choice to the provider.
    #[default]
    Default,
}

impl SendNotifications {
    /// Returns the provider query-parameter value, or `None` when the
    /// provider default should apply.
    pub fn as_provider_param(&self) -> Option<&'static str> {
        match self {
            Self::All => Some("all"),
            Self::None => Some("none"),
            Self::ExternalOnly => Some("externalOnly"),
            Self::Default => None,
        }
    }
}

/// An attendee supplied in a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeParam {
    /// The attendee's email address.
    pub email: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Event parameters carried by a tool call.
///
/// For updates, only the fields actually present are merged into the
/// existing event; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParameters {
    /// Event title. Auto-generated from the user's name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Event start. Required for creates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,

    /// Event end. Defaults from the start when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,

    /// Location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Attendees to invite.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<AttendeeParam>,

    /// Provider-shaped reminder settings, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<serde_json::Value>,

    /// Whether to attach a video conference to the event.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub add_conference_call: bool,

    /// Attendee notification routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_notifications: Option<SendNotifications>,

    /// IANA timezone for rendering the event, when the user stated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// Email the end user provided for attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    /// Name the end user provided for attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Lower bound for read actions (defaults to now).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_min: Option<DateTime<Utc>>,

    /// Upper bound for read actions (defaults to one year out).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_max: Option<DateTime<Utc>>,
}

impl EventParameters {
    /// Returns `true` if these parameters carry any event field change.
    ///
    /// Updates with no changes are short-circuited without a provider call.
    /// `send_notifications` alone does not count: it routes delivery of a
    /// change, it is not one.
    pub fn has_event_changes(&self) -> bool {
        self.summary.is_some()
            || self.start.is_some()
            || self.end.is_some()
            || self.location.is_some()
            || self.description.is_some()
            || !self.attendees.is_empty()
            || self.reminders.is_some()
            || self.add_conference_call
            || self.time_zone.is_some()
    }
}

/// A tool call from the chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// The integration record to operate on.
    pub integration_id: String,

    /// The requested operation.
    pub action: ActionKind,

    /// Provider event id; required for update/delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Event parameters.
    #[serde(default)]
    pub parameters: EventParameters,

    /// Chat-channel identity of the caller (e.g. `whatsapp:+1555...`).
    pub requesting_user_id: String,
}

impl Action {
    /// Creates an action with empty parameters.
    pub fn new(
        integration_id: impl Into<String>,
        action: ActionKind,
        requesting_user_id: impl Into<String>,
    ) -> Self {
        Self {
            integration_id: integration_id.into(),
            action,
            event_id: None,
            parameters: EventParameters::default(),
            requesting_user_id: requesting_user_id.into(),
        }
    }

    /// Builder: set the event id.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Builder: set the parameters.
    pub fn with_parameters(mut self, parameters: EventParameters) -> Self {
        self.parameters = parameters;
        self
    }
}
