//! Booked-event types.
//!
//! This module provides the provider-agnostic representation of a calendar
//! event as the booking engine sees it, including the [`Attribution`] tag
//! that links an event back to the chat user who caused its creation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::ChannelIdentity;
use crate::time::EventTime;

/// Extended-property key for the attributed user's canonical identity.
pub const ATTR_USER_ID: &str = "bookedByUserId";
/// Extended-property key for the attributed user's email, if provided.
pub const ATTR_EMAIL: &str = "bookedByEmail";
/// Extended-property key for the attributed user's display name, if provided.
pub const ATTR_NAME: &str = "bookedByName";

/// The attribution tag embedded in a calendar event.
///
/// Written into the provider's private extended-properties bag at creation
/// time and carried forward on every update. It is the only persistent link
/// between a calendar event and the chat user who booked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    /// Canonical identity of the user who booked the event.
    pub user_id: ChannelIdentity,
    /// Email the user supplied when booking, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name the user supplied when booking, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attribution {
    /// Creates an attribution for the given identity.
    pub fn new(user_id: ChannelIdentity) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
        }
    }

    /// Builder: set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder: set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Serializes the attribution into extended-property key/value pairs.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let mut props = HashMap::new();
        props.insert(ATTR_USER_ID.to_string(), self.user_id.as_str().to_string());
        if let Some(ref email) = self.email {
            props.insert(ATTR_EMAIL.to_string(), email.clone());
        }
        if let Some(ref name) = self.name {
            props.insert(ATTR_NAME.to_string(), name.clone());
        }
        props
    }

    /// Reads an attribution back out of extended properties.
    ///
    /// Returns `None` when the event carries no attribution tag (legacy
    /// events, or events created outside the bot).
    pub fn from_properties(props: &HashMap<String, String>) -> Option<Self> {
        let user_id = props.get(ATTR_USER_ID)?;
        Some(Self {
            user_id: ChannelIdentity::from_canonical(user_id.clone()),
            email: props.get(ATTR_EMAIL).cloned(),
            name: props.get(ATTR_NAME).cloned(),
        })
    }
}

/// An event attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,
    /// The attendee's display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Attendee {
    /// Creates an attendee with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
        }
    }

    /// Builder: set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A calendar event as the booking engine sees it.
///
/// Lives authoritatively in the external provider; this is the transient
/// mirror returned from gateway calls and surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedEvent {
    /// Provider event identifier.
    pub id: String,
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Start time.
    pub start: EventTime,
    /// End time.
    pub end: EventTime,
    /// Location, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Description, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attendees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    /// Provider-shaped reminder settings, mirrored verbatim so updates can
    /// carry them forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<serde_json::Value>,
    /// Attribution tag, if the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    /// Link to the event in the provider's UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    /// Video-call link, if a conference was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    /// Provider ETag for conditional updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl BookedEvent {
    /// Creates a minimal event with id, start, and end.
    pub fn new(id: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            id: id.into(),
            summary: None,
            start,
            end,
            location: None,
            description: None,
            attendees: Vec::new(),
            reminders: None,
            attribution: None,
            html_link: None,
            hangout_link: None,
            etag: None,
        }
    }

    /// Returns `true` if this event is attributed to the given identity.
    pub fn is_attributed_to(&self, identity: &ChannelIdentity) -> bool {
        self.attribution
            .as_ref()
            .is_some_and(|a| a.user_id == *identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_times() -> (EventTime, EventTime) {
        let start = chrono::Utc.with_ymd_and_hms(2025, 6, 12, 10, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 6, 12, 10, 30, 0).unwrap();
        (EventTime::from_utc(start), EventTime::from_utc(end))
    }

    #[test]
    fn attribution_property_roundtrip() {
        let attribution = Attribution::new(ChannelIdentity::normalize("whatsapp:+15551230000"))
            .with_email("ada@example.com")
            .with_name("Ada");

        let props = attribution.to_properties();
        assert_eq!(props.get(ATTR_USER_ID).unwrap(), "+15551230000");
        assert_eq!(props.get(ATTR_EMAIL).unwrap(), "ada@example.com");
        assert_eq!(props.get(ATTR_NAME).unwrap(), "Ada");

        let parsed = Attribution::from_properties(&props).unwrap();
        assert_eq!(parsed, attribution);
    }

    #[test]
    fn attribution_absent_without_user_id() {
        let mut props = HashMap::new();
        props.insert(ATTR_EMAIL.to_string(), "ada@example.com".to_string());
        assert!(Attribution::from_properties(&props).is_none());
    }

    #[test]
    fn attribution_minimal() {
        let attribution = Attribution::new(ChannelIdentity::normalize("+15551230000"));
        let props = attribution.to_properties();
        assert_eq!(props.len(), 1);
        assert!(Attribution::from_properties(&props).is_some());
    }

    #[test]
    fn event_attribution_match() {
        let (start, end) = sample_times();
        let mut event = BookedEvent::new("evt-1", start, end);
        let ada = ChannelIdentity::normalize("+15551230000");
        let bob = ChannelIdentity::normalize("+15559990000");

        assert!(!event.is_attributed_to(&ada));

        event.attribution = Some(Attribution::new(ada.clone()));
        assert!(event.is_attributed_to(&ada));
        assert!(!event.is_attributed_to(&bob));
    }

    #[test]
    fn event_serde_camel_case() {
        let (start, end) = sample_times();
        let mut event = BookedEvent::new("evt-1", start, end);
        event.html_link = Some("https://calendar.example/evt-1".to_string());

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"htmlLink\""));
        assert!(!json.contains("\"attendees\""), "empty vec is skipped");

        let parsed: BookedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
