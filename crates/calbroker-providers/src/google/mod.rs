//! Google Calendar gateway implementation.

mod client;
mod oauth;

pub use client::GoogleCalendarGateway;
pub use oauth::OAuthClient;
