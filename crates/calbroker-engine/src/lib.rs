//! The calendar booking engine.
//!
//! This crate composes the pieces a chat tool call flows through:
//!
//! - [`tokens`]: keeps integration access tokens fresh, persisting every
//!   state transition to the integration store.
//! - [`permission`]: decides whether a requester may mutate an event, based
//!   on the event's attribution tag and the requester's agent role.
//! - [`concurrency`]: runs the pre-insert booking checks (single active
//!   booking, then slot ceiling).
//! - [`orchestrator`]: the [`BookingEngine`] entry point dispatching
//!   create/update/delete and the read actions.
//! - [`integration`]: the integration record and its store abstraction.
//!
//! The engine holds no calendar state of its own; the external provider,
//! reached through `calbroker_providers::CalendarGateway`, is authoritative.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod integration;
pub mod orchestrator;
pub mod permission;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testutil;

pub use concurrency::ConcurrencyController;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use integration::{
    IntegrationRecord, IntegrationStatus, IntegrationStore, MemoryIntegrationStore, StoreError,
    INTEGRATION_TYPE_CALENDAR,
};
pub use orchestrator::BookingEngine;
pub use permission::{AgentRole, PermissionResolver, RoleStore, StaticRoleStore};
pub use tokens::TokenLifecycleManager;
