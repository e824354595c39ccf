//! Tool-call request and outcome types for calbroker.
//!
//! The chat pipeline (an LLM deciding that the user wants to book, move, or
//! cancel an appointment) emits tool calls; the booking engine consumes them
//! and answers with a structured outcome the pipeline can relay back into
//! the conversation.
//!
//! # Shape
//!
//! Inbound: an [`Action`] naming the operation, the integration to run it
//! against, the event parameters, and the chat-channel identity of the
//! requesting user.
//!
//! Outbound: an [`Outcome`] with a `success` flag, a human-readable
//! `message` for the LLM to relay, a normalized event `result` on success,
//! and machine-readable flags (`requested_slot_unavailable`,
//! `user_already_has_appointment`) so the pipeline can branch without
//! re-parsing prose.
//!
//! # Example
//!
//! ```rust
//! use calbroker_protocol::{Action, ActionKind, EventParameters};
//!
//! let json = r#"{
//!     "integrationId": "int-1",
//!     "action": "createEvent",
//!     "parameters": {"start": {"type": "dateTime", "value": "2025-06-12T10:00:00Z"}},
//!     "requestingUserId": "whatsapp:+15551230000"
//! }"#;
//! let action: Action = serde_json::from_str(json).unwrap();
//! assert_eq!(action.action, ActionKind::CreateEvent);
//! ```

mod action;
mod outcome;

pub use action::{Action, ActionKind, AttendeeParam, EventParameters, SendNotifications};
pub use outcome::{ErrorCode, EventResult, Outcome};
