//! Core types: event times, booking windows, channel identities, events

pub mod event;
pub mod identity;
pub mod time;
pub mod tracing;

pub use event::{Attendee, Attribution, BookedEvent};
pub use identity::ChannelIdentity;
pub use time::{EventTime, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
