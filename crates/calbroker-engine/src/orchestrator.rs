//! The booking engine entry point.
//!
//! [`BookingEngine::handle`] consumes one tool call and produces one
//! outcome. Every action runs the same preamble: load the integration,
//! check its type and active state, ensure a fresh access token, and
//! normalize the requesting identity. The per-action flows then compose the
//! concurrency controller, the permission resolver, and the gateway.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use calbroker_core::event::ATTR_USER_ID;
use calbroker_core::{Attendee, Attribution, ChannelIdentity, TimeWindow};
use calbroker_protocol::{Action, ActionKind, EventParameters, EventResult, Outcome};
use calbroker_providers::{
    CalendarContext, CalendarGateway, CalendarProviderConfig, EventPayload, ListQuery,
};

use crate::concurrency::ConcurrencyController;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::integration::{IntegrationRecord, IntegrationStore};
use crate::permission::{PermissionResolver, RoleStore};
use crate::tokens::TokenLifecycleManager;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Orchestrates calendar event mutations for chat tool calls.
pub struct BookingEngine {
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn IntegrationStore>,
    config: EngineConfig,
    tokens: TokenLifecycleManager,
    permissions: PermissionResolver,
    concurrency: ConcurrencyController,
    clock: Clock,
}

impl BookingEngine {
    /// Creates an engine over the given gateway, stores, and configuration.
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        store: Arc<dyn IntegrationStore>,
        roles: Arc<dyn RoleStore>,
        config: EngineConfig,
    ) -> Self {
        let tokens = TokenLifecycleManager::new(gateway.clone(), store.clone());
        let permissions = PermissionResolver::new(roles);
        let concurrency = ConcurrencyController::new(gateway.clone(), config.clone());
        Self {
            gateway,
            store,
            config,
            tokens,
            permissions,
            concurrency,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the time source. Used by tests to pin "now".
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Handles one tool call, always producing an outcome.
    pub async fn handle(&self, action: Action) -> Outcome {
        let kind = action.action;
        let integration_id = action.integration_id.clone();
        match self.dispatch(&action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "{} on integration {} failed: {}",
                    kind.as_str(),
                    integration_id,
                    e
                );
                e.into_outcome()
            }
        }
    }

    async fn dispatch(&self, action: &Action) -> EngineResult<Outcome> {
        if action.action.requires_event_id() && action.event_id.is_none() {
            return Err(EngineError::Validation(format!(
                "{} requires an event id",
                action.action.as_str()
            )));
        }

        let mut record = self
            .store
            .get(action.integration_id.clone())
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("integration {}", action.integration_id))
            })?;

        if !record.is_calendar() {
            return Err(EngineError::WrongIntegrationType {
                id: record.id.clone(),
                integration_type: record.integration_type.clone(),
            });
        }
        if !record.is_usable() {
            return Err(EngineError::IntegrationInactive(record.id.clone()));
        }

        let now = self.now();
        let provider_config = self.tokens.ensure_fresh(&mut record, now).await?;
        let context = CalendarContext::new(
            provider_config.access_token(),
            provider_config.calendar_id(),
        );
        let requester = ChannelIdentity::normalize(&action.requesting_user_id);

        match action.action {
            ActionKind::CreateEvent => {
                self.create_event(action, &provider_config, &context, &requester, now)
                    .await
            }
            ActionKind::UpdateEvent => {
                self.update_event(action, &record, &context, &requester)
                    .await
            }
            ActionKind::DeleteEvent => self.delete_event(action, &record, &context, &requester).await,
            ActionKind::GetMyBookedEvents => {
                self.get_my_booked_events(action, &context, &requester, now)
                    .await
            }
            ActionKind::GetEvents => self.get_events(action, &context, now).await,
        }
    }

    async fn create_event(
        &self,
        action: &Action,
        provider_config: &CalendarProviderConfig,
        context: &CalendarContext,
        requester: &ChannelIdentity,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome> {
        let params = &action.parameters;

        let start = params.start.ok_or_else(|| {
            EngineError::Validation("a start time is required to book an appointment".to_string())
        })?;
        let end = params
            .end
            .unwrap_or_else(|| start.default_end(self.config.default_duration_minutes));
        if end.to_utc_datetime() <= start.to_utc_datetime() {
            return Err(EngineError::Validation(
                "the end time must be after the start time".to_string(),
            ));
        }

        let ceiling = provider_config
            .max_concurrent_appointments()
            .unwrap_or(self.config.default_max_concurrent);
        let window = TimeWindow::from_event_times(&start, &end);
        self.concurrency
            .authorize_new_booking(context, window, requester, ceiling, now)
            .await?;

        let mut attribution = Attribution::new(requester.clone());
        if let Some(ref email) = params.user_email {
            attribution = attribution.with_email(email.clone());
        }
        if let Some(ref name) = params.user_name {
            attribution = attribution.with_name(name.clone());
        }

        // No summary is not a booking blocker; derive one from the user.
        let summary = params.summary.clone().unwrap_or_else(|| match params.user_name {
            Some(ref name) => format!("Appointment for {}", name),
            None => "Appointment".to_string(),
        });

        let mut payload = EventPayload::new(start, end);
        payload.summary = Some(summary.clone());
        payload.description = params.description.clone();
        payload.location = params.location.clone();
        payload.time_zone = params
            .time_zone
            .clone()
            .or_else(|| provider_config.time_zone().map(String::from));
        payload.attendees = convert_attendees(params);
        payload.private_properties = attribution.to_properties();
        payload.reminders = params.reminders.clone();
        payload.create_conference = params.add_conference_call;
        payload.send_notifications = notification_param(params);

        let created = self.gateway.insert_event(context.clone(), payload).await?;
        info!(
            "booked event {} for {} on calendar {}",
            created.id,
            requester.as_str(),
            context.calendar_id
        );

        Ok(Outcome::ok(format!("Booked \"{}\".", summary)).with_result(created.into()))
    }

    async fn update_event(
        &self,
        action: &Action,
        record: &IntegrationRecord,
        context: &CalendarContext,
        requester: &ChannelIdentity,
    ) -> EngineResult<Outcome> {
        let event_id = require_event_id(action)?;

        let existing = self
            .gateway
            .get_event(context.clone(), event_id.clone())
            .await?;
        self.permissions
            .authorize(&existing, requester, &record.agent_id)
            .await?;

        if !action.parameters.has_event_changes() {
            debug!("update of event {} carries no changes", event_id);
            return Ok(Outcome::ok(
                "No changes were requested; the appointment is unchanged.",
            )
            .with_result(existing.into()));
        }

        let params = &action.parameters;
        let start = params.start.unwrap_or(existing.start);
        let end = params.end.unwrap_or(existing.end);
        if end.to_utc_datetime() <= start.to_utc_datetime() {
            return Err(EngineError::Validation(
                "the end time must be after the start time".to_string(),
            ));
        }

        // Replace only the fields the caller sent; everything else, and in
        // particular the attribution tag, is carried forward unchanged.
        let mut payload = EventPayload::new(start, end);
        payload.summary = params.summary.clone().or_else(|| existing.summary.clone());
        payload.description = params
            .description
            .clone()
            .or_else(|| existing.description.clone());
        payload.location = params.location.clone().or_else(|| existing.location.clone());
        payload.time_zone = params.time_zone.clone();
        payload.attendees = if params.attendees.is_empty() {
            existing.attendees.clone()
        } else {
            convert_attendees(params)
        };
        payload.private_properties = existing
            .attribution
            .as_ref()
            .map(Attribution::to_properties)
            .unwrap_or_default();
        payload.reminders = params.reminders.clone().or_else(|| existing.reminders.clone());
        payload.create_conference = params.add_conference_call;
        payload.send_notifications = notification_param(params);

        let updated = self
            .gateway
            .update_event(context.clone(), event_id.clone(), payload, existing.etag.clone())
            .await?;
        info!("updated event {} for {}", event_id, requester.as_str());

        Ok(Outcome::ok("Appointment updated.").with_result(updated.into()))
    }

    async fn delete_event(
        &self,
        action: &Action,
        record: &IntegrationRecord,
        context: &CalendarContext,
        requester: &ChannelIdentity,
    ) -> EngineResult<Outcome> {
        let event_id = require_event_id(action)?;

        let existing = match self.gateway.get_event(context.clone(), event_id.clone()).await {
            Ok(event) => event,
            Err(e) if e.code().is_absent() => {
                debug!("event {} is already gone; treating delete as done", event_id);
                return Ok(already_deleted_outcome());
            }
            Err(e) => return Err(e.into()),
        };

        self.permissions
            .authorize(&existing, requester, &record.agent_id)
            .await?;

        match self
            .gateway
            .delete_event(
                context.clone(),
                event_id.clone(),
                notification_param(&action.parameters),
            )
            .await
        {
            Ok(()) => {}
            // Deleted concurrently: the end state is what was asked for.
            Err(e) if e.code().is_absent() => return Ok(already_deleted_outcome()),
            Err(e) => return Err(e.into()),
        }

        info!("cancelled event {} for {}", event_id, requester.as_str());
        Ok(Outcome::ok("Appointment cancelled.").with_result(existing.into()))
    }

    async fn get_my_booked_events(
        &self,
        action: &Action,
        context: &CalendarContext,
        requester: &ChannelIdentity,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome> {
        let (time_min, time_max) = self.read_window(&action.parameters, now)?;
        let query = ListQuery::new(time_min, time_max)
            .with_private_property(ATTR_USER_ID, requester.as_str());

        let events = self.gateway.list_events(context.clone(), query).await?;

        // The provider filter is a hint; re-check the tag and drop duplicate
        // ids (recurring expansions can repeat an id across pages).
        let mut seen = HashSet::new();
        let mine: Vec<EventResult> = events
            .into_iter()
            .filter(|e| e.is_attributed_to(requester))
            .filter(|e| seen.insert(e.id.clone()))
            .map(Into::into)
            .collect();

        let message = match mine.len() {
            0 => "You have no booked appointments.".to_string(),
            1 => "You have 1 booked appointment.".to_string(),
            n => format!("You have {} booked appointments.", n),
        };
        Ok(Outcome::ok(message).with_events(mine))
    }

    async fn get_events(
        &self,
        action: &Action,
        context: &CalendarContext,
        now: DateTime<Utc>,
    ) -> EngineResult<Outcome> {
        let (time_min, time_max) = self.read_window(&action.parameters, now)?;
        let query = ListQuery::new(time_min, time_max);

        let events = self.gateway.list_events(context.clone(), query).await?;
        let results: Vec<EventResult> = events.into_iter().map(Into::into).collect();

        let message = match results.len() {
            0 => "No events found in that window.".to_string(),
            1 => "Found 1 event.".to_string(),
            n => format!("Found {} events.", n),
        };
        Ok(Outcome::ok(message).with_events(results))
    }

    fn read_window(
        &self,
        params: &EventParameters,
        now: DateTime<Utc>,
    ) -> EngineResult<(DateTime<Utc>, DateTime<Utc>)> {
        let time_min = params.time_min.unwrap_or(now);
        let time_max = params
            .time_max
            .unwrap_or_else(|| now + Duration::days(self.config.list_horizon_days));
        if time_max <= time_min {
            return Err(EngineError::Validation(
                "timeMax must be after timeMin".to_string(),
            ));
        }
        Ok((time_min, time_max))
    }

    /// Disconnects an integration: best-effort token revocation, then the
    /// record is marked inactive. Revocation failures are logged only; the
    /// disconnect itself must not depend on the provider being reachable.
    pub async fn deactivate_integration(&self, integration_id: &str) -> EngineResult<Outcome> {
        let mut record = self
            .store
            .get(integration_id.to_string())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("integration {}", integration_id)))?;

        if record.is_calendar() {
            if let Ok(config) = CalendarProviderConfig::from_value(record.config.clone()) {
                // Revoking the refresh token invalidates the whole grant.
                let token = config
                    .refresh_token()
                    .unwrap_or_else(|| config.access_token())
                    .to_string();
                if let Err(e) = self.gateway.revoke_token(token).await {
                    warn!(
                        "best-effort token revoke for integration {} failed: {}",
                        record.id, e
                    );
                }
            }
        }

        record.is_active = false;
        self.store.update(record.clone()).await?;
        info!("integration {} deactivated", record.id);
        Ok(Outcome::ok("Calendar integration disconnected."))
    }
}

fn require_event_id(action: &Action) -> EngineResult<String> {
    action.event_id.clone().ok_or_else(|| {
        EngineError::Validation(format!("{} requires an event id", action.action.as_str()))
    })
}

fn convert_attendees(params: &EventParameters) -> Vec<Attendee> {
    params
        .attendees
        .iter()
        .map(|a| Attendee {
            email: a.email.clone(),
            display_name: a.display_name.clone(),
        })
        .collect()
}

fn notification_param(params: &EventParameters) -> Option<String> {
    params
        .send_notifications
        .and_then(|s| s.as_provider_param())
        .map(String::from)
}

fn already_deleted_outcome() -> Outcome {
    Outcome::ok("That appointment was already cancelled.")
        .with_details(serde_json::json!({"status": "already_deleted"}))
}
