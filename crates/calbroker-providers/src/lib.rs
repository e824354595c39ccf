//! CalendarGateway trait and implementations.
//!
//! This crate is the seam between the booking engine and external calendar
//! providers:
//!
//! - [`CalendarGateway`] - The trait the engine talks through
//! - [`GoogleCalendarGateway`] - The Google Calendar API v3 implementation
//! - [`CalendarProviderConfig`] - Typed view of an integration's config blob
//! - [`GatewayError`] - Error types for gateway operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   booking engine     │
//! └──────────┬───────────┘
//!            │  CalendarGateway
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ GoogleCalendarGateway│────▶│  Google Calendar API │
//! └──────────────────────┘     └──────────────────────┘
//! ```
//!
//! Gateways are stateless with respect to credentials: every call carries a
//! [`CalendarContext`] with a currently valid access token, so the engine
//! retains control of the token lifecycle.

pub mod config;
pub mod error;
pub mod gateway;
pub mod google;

// Re-export main types at crate root
pub use config::{
    CalendarProviderConfig, GoogleCalendarConfig, OAuthAppCredentials, DEFAULT_CALENDAR_ID,
    EXPIRY_SKEW_SECONDS,
};
pub use error::{GatewayError, GatewayErrorCode, GatewayResult};
pub use gateway::{
    BoxFuture, CalendarContext, CalendarGateway, CalendarListing, ErrorGateway, EventPayload,
    ListQuery, TokenGrant,
};
pub use google::{GoogleCalendarGateway, OAuthClient};
