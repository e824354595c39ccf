//! Engine configuration.

/// Tunable policy knobs for the booking engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default appointment length in minutes when the caller gives a start
    /// but no end.
    pub default_duration_minutes: i64,
    /// Concurrency ceiling used when the integration does not configure one.
    pub default_max_concurrent: u32,
    /// How far into the future the active-booking scan looks, in days.
    pub active_booking_horizon_days: i64,
    /// Whether a user may hold only one active booking at a time.
    pub enforce_single_booking: bool,
    /// Default upper bound for read actions, in days from now.
    pub list_horizon_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
            default_max_concurrent: 1,
            active_booking_horizon_days: 365,
            enforce_single_booking: true,
            list_horizon_days: 365,
        }
    }
}

impl EngineConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default appointment duration.
    #[must_use]
    pub fn with_default_duration_minutes(mut self, minutes: i64) -> Self {
        self.default_duration_minutes = minutes;
        self
    }

    /// Set the fallback concurrency ceiling.
    #[must_use]
    pub fn with_default_max_concurrent(mut self, ceiling: u32) -> Self {
        self.default_max_concurrent = ceiling;
        self
    }

    /// Enable or disable single-active-booking enforcement.
    #[must_use]
    pub fn with_enforce_single_booking(mut self, enforce: bool) -> Self {
        self.enforce_single_booking = enforce;
        self
    }

    /// Set the active-booking scan horizon.
    #[must_use]
    pub fn with_active_booking_horizon_days(mut self, days: i64) -> Self {
        self.active_booking_horizon_days = days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_duration_minutes, 60);
        assert_eq!(config.default_max_concurrent, 1);
        assert_eq!(config.active_booking_horizon_days, 365);
        assert!(config.enforce_single_booking);
    }

    #[test]
    fn builder_methods() {
        let config = EngineConfig::new()
            .with_default_duration_minutes(30)
            .with_default_max_concurrent(4)
            .with_enforce_single_booking(false)
            .with_active_booking_horizon_days(90);

        assert_eq!(config.default_duration_minutes, 30);
        assert_eq!(config.default_max_concurrent, 4);
        assert!(!config.enforce_single_booking);
        assert_eq!(config.active_booking_horizon_days, 90);
    }
}
