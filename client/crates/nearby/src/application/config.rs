//! Application Configuration
//!
//! Configuration for the geo-keyed cache.

use std::time::Duration;

use platform::geo::DEFAULT_KEY_PRECISION;

/// Geo cache configuration
#[derive(Debug, Clone)]
pub struct GeoCacheConfig {
    /// How long a cached result stays fresh (60 seconds)
    pub ttl: Duration,
    /// Minimum time between successful fetches of any key (10 seconds)
    pub min_interval: Duration,
    /// Decimal places kept when quantizing coordinates
    pub precision: u8,
}

impl Default for GeoCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            min_interval: Duration::from_secs(10),
            precision: DEFAULT_KEY_PRECISION,
        }
    }
}

impl GeoCacheConfig {
    /// Create config for development (short rate window)
    pub fn development() -> Self {
        Self {
            min_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }
}
