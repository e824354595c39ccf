//! Booking concurrency control.
//!
//! Two checks gate every new booking, in order:
//!
//! 1. Single-active-booking: when enforcement is on, a requester who already
//!    holds a booking that has not ended yet may not create another.
//! 2. Slot ceiling: the number of events overlapping the requested
//!    `[start, end)` window must stay below the integration's ceiling.
//!
//! Both checks query the provider; a failed query always rejects the
//! booking. Availability is never assumed.
//!
//! The window between these checks and the subsequent insert is not closed;
//! two simultaneous requests can both pass. Serializing inserts per calendar
//! is the extension point if that ever matters in practice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use calbroker_core::{ChannelIdentity, TimeWindow};
use calbroker_core::event::ATTR_USER_ID;
use calbroker_providers::{CalendarContext, CalendarGateway, ListQuery};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Runs the pre-insert booking checks.
pub struct ConcurrencyController {
    gateway: Arc<dyn CalendarGateway>,
    config: EngineConfig,
}

impl ConcurrencyController {
    /// Creates a controller over the given gateway.
    pub fn new(gateway: Arc<dyn CalendarGateway>, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    /// Authorizes a new booking in `window` for `requester`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateActiveBooking` when the requester already holds an
    /// active booking, `SlotUnavailable` when the window is at its ceiling,
    /// and `AvailabilityCheckFailed` when either query fails.
    pub async fn authorize_new_booking(
        &self,
        context: &CalendarContext,
        window: TimeWindow,
        requester: &ChannelIdentity,
        ceiling: u32,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.config.enforce_single_booking {
            self.check_no_active_booking(context, requester, now).await?;
        }
        self.check_slot_capacity(context, window, ceiling).await
    }

    async fn check_no_active_booking(
        &self,
        context: &CalendarContext,
        requester: &ChannelIdentity,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let scan = TimeWindow::until_horizon(now, self.config.active_booking_horizon_days);
        let query = ListQuery::new(scan.start, scan.end)
            .with_private_property(ATTR_USER_ID, requester.as_str());

        let events = self
            .gateway
            .list_events(context.clone(), query)
            .await
            .map_err(|e| {
                EngineError::AvailabilityCheckFailed(format!(
                    "active-booking lookup failed: {}",
                    e
                ))
            })?;

        // The provider filter is authoritative, but double-check the tag and
        // drop bookings that already ended.
        let existing = events
            .into_iter()
            .find(|e| e.is_attributed_to(requester) && e.end.is_after_utc(now));

        match existing {
            Some(event) => {
                info!(
                    "rejecting booking: {} already holds active event {}",
                    requester.as_str(),
                    event.id
                );
                Err(EngineError::DuplicateActiveBooking {
                    existing: Box::new(event),
                })
            }
            None => Ok(()),
        }
    }

    async fn check_slot_capacity(
        &self,
        context: &CalendarContext,
        window: TimeWindow,
        ceiling: u32,
    ) -> EngineResult<()> {
        let query = ListQuery::new(window.start, window.end);

        let events = self
            .gateway
            .list_events(context.clone(), query)
            .await
            .map_err(|e| {
                EngineError::AvailabilityCheckFailed(format!("availability query failed: {}", e))
            })?;

        let overlapping = events
            .iter()
            .filter(|e| window.overlaps(&e.start, &e.end))
            .count() as u32;

        debug!(
            "slot check: {} overlapping events, ceiling {}",
            overlapping, ceiling
        );

        if overlapping >= ceiling {
            return Err(EngineError::SlotUnavailable {
                overlapping,
                ceiling,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{attributed_event, event, now, utc, FakeGateway};
    use calbroker_providers::GatewayErrorCode;

    fn context() -> CalendarContext {
        CalendarContext::new("token", "primary")
    }

    fn window(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeWindow {
        TimeWindow::new(utc(start_h, start_m), utc(end_h, end_m))
    }

    fn controller(gateway: FakeGateway, config: EngineConfig) -> ConcurrencyController {
        ConcurrencyController::new(Arc::new(gateway), config)
    }

    #[tokio::test]
    async fn empty_calendar_allows_booking() {
        let controller = controller(FakeGateway::new(), EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(10, 0, 10, 30), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn single_slot_ceiling_rejects_overlap() {
        // Ceiling 1, 10:00-10:30 booked: 10:15-10:45 must be rejected.
        let gateway = FakeGateway::new().with_events(vec![event("evt-1", 10, 0, 10, 30)]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        let err = controller
            .authorize_new_booking(&context(), window(10, 15, 10, 45), &requester, 1, now())
            .await
            .unwrap_err();

        match err {
            EngineError::SlotUnavailable {
                overlapping,
                ceiling,
            } => {
                assert_eq!(overlapping, 1);
                assert_eq!(ceiling, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_overlapping_slot_is_allowed() {
        // Ceiling 1, 10:00-10:30 booked: 11:00-11:30 succeeds.
        let gateway = FakeGateway::new().with_events(vec![event("evt-1", 10, 0, 10, 30)]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(11, 0, 11, 30), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn back_to_back_bookings_are_allowed() {
        let gateway = FakeGateway::new().with_events(vec![event("evt-1", 10, 0, 10, 30)]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(10, 30, 11, 0), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ceiling_n_allows_up_to_n_minus_one_overlaps() {
        let gateway = FakeGateway::new().with_events(vec![
            event("evt-1", 10, 0, 11, 0),
            event("evt-2", 10, 0, 11, 0),
        ]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        // Two of three slots taken: allowed.
        controller
            .authorize_new_booking(&context(), window(10, 0, 11, 0), &requester, 3, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ceiling_n_rejects_at_n_overlaps() {
        let gateway = FakeGateway::new().with_events(vec![
            event("evt-1", 10, 0, 11, 0),
            event("evt-2", 10, 0, 11, 0),
            event("evt-3", 10, 0, 11, 0),
        ]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        let err = controller
            .authorize_new_booking(&context(), window(10, 0, 11, 0), &requester, 3, now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::SlotUnavailable {
                overlapping: 3,
                ceiling: 3
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_active_booking_is_rejected_before_slot_check() {
        let gateway = FakeGateway::new().with_events(vec![attributed_event(
            "evt-1",
            14,
            0,
            14,
            30,
            "+15551230000",
        )]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("whatsapp:+1 555-123-0000");

        // The requested slot itself is free; the duplicate check still fires.
        let err = controller
            .authorize_new_booking(&context(), window(16, 0, 16, 30), &requester, 5, now())
            .await
            .unwrap_err();

        match err {
            EngineError::DuplicateActiveBooking { existing } => {
                assert_eq!(existing.id, "evt-1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn ended_booking_does_not_count_as_active() {
        // now() is 09:00; an 08:00-08:30 booking has already ended.
        let gateway = FakeGateway::new().with_events(vec![attributed_event(
            "evt-1",
            8,
            0,
            8,
            30,
            "+15551230000",
        )]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(10, 0, 10, 30), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_users_bookings_do_not_trigger_duplicate_check() {
        let gateway = FakeGateway::new().with_events(vec![attributed_event(
            "evt-1",
            14,
            0,
            14,
            30,
            "+15559990000",
        )]);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(10, 0, 10, 30), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enforcement_off_skips_duplicate_check() {
        let gateway = FakeGateway::new().with_events(vec![attributed_event(
            "evt-1",
            14,
            0,
            14,
            30,
            "+15551230000",
        )]);
        let config = EngineConfig::default().with_enforce_single_booking(false);
        let controller = controller(gateway, config);
        let requester = ChannelIdentity::normalize("+15551230000");

        controller
            .authorize_new_booking(&context(), window(10, 0, 10, 30), &requester, 1, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_query_never_allows() {
        let gateway = FakeGateway::new();
        *gateway.list_failure.lock().unwrap() = Some(GatewayErrorCode::ServerError);
        let controller = controller(gateway, EngineConfig::default());
        let requester = ChannelIdentity::normalize("+15551230000");

        let err = controller
            .authorize_new_booking(&context(), window(10, 0, 10, 30), &requester, 1, now())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::AvailabilityCheckFailed(_)));
    }
}
