//! Application Configuration
//!
//! Configuration for the exclusive flow.

use std::time::Duration;

/// Exclusive flow configuration
#[derive(Debug, Clone)]
pub struct ExclusiveConfig {
    /// Distance at which the user counts as arrived (150 meters)
    pub arrival_radius_m: f64,
    /// How often proximity is polled while walking (5 seconds)
    pub proximity_poll_interval: Duration,
    /// Upper bound for one location reading (8 seconds)
    pub location_timeout: Duration,
    /// Countdown resolution (1 second)
    pub countdown_tick: Duration,
}

impl Default for ExclusiveConfig {
    fn default() -> Self {
        Self {
            arrival_radius_m: 150.0,
            proximity_poll_interval: Duration::from_secs(5),
            location_timeout: Duration::from_secs(8),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

impl ExclusiveConfig {
    /// Create config for development (wide radius, fast polling)
    pub fn development() -> Self {
        Self {
            arrival_radius_m: 500.0,
            proximity_poll_interval: Duration::from_secs(1),
            ..Default::default()
        }
    }
}
