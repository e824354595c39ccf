//! Time types for booked calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (either a specific datetime or an all-day date), and [`TimeWindow`] for the
//! half-open query/overlap ranges the booking checks operate on.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event.
///
/// Calendar events come in two flavors:
/// - **DateTime**: a specific point in time (stored as UTC)
/// - **AllDay**: a date without a specific time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// All-day events compare at midnight UTC on their date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Computes a default end time for an event starting at this time.
    ///
    /// Timed events end `duration_minutes` later; all-day events end the
    /// following day, matching provider conventions for single-day events.
    pub fn default_end(&self, duration_minutes: i64) -> Self {
        match self {
            Self::DateTime(dt) => Self::DateTime(*dt + Duration::minutes(duration_minutes)),
            Self::AllDay(date) => {
                Self::AllDay(date.succ_opt().expect("valid successor date"))
            }
        }
    }

    /// Returns `true` if this time is strictly after the given UTC instant.
    ///
    /// Used to decide whether a booking is still active (its end has not
    /// passed yet).
    pub fn is_after_utc(&self, instant: DateTime<Utc>) -> bool {
        self.to_utc_datetime() > instant
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A half-open time window `[start, end)` in UTC.
///
/// Booking checks use windows both for the requested slot and for the
/// availability queries sent to the calendar provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates the window spanning a candidate booking.
    pub fn from_event_times(start: &EventTime, end: &EventTime) -> Self {
        Self::new(start.to_utc_datetime(), end.to_utc_datetime())
    }

    /// Creates the wide scan window used for active-booking lookups:
    /// from `now` out to `horizon_days` in the future.
    pub fn until_horizon(now: DateTime<Utc>, horizon_days: i64) -> Self {
        Self::new(now, now + Duration::days(horizon_days))
    }

    /// Returns the duration of this window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks whether an event with the given start/end overlaps this window.
    ///
    /// Half-open semantics: an event that ends exactly at `start` or begins
    /// exactly at `end` does not overlap.
    pub fn overlaps(&self, event_start: &EventTime, event_end: &EventTime) -> bool {
        let start = event_start.to_utc_datetime();
        let end = event_end.to_utc_datetime();
        start < self.end && end > self.start
    }
}
