//! Rate Limiting Infrastructure
//!
//! Minimum-interval window: once a first success is recorded, no new call of
//! the same class may start until `min_interval` has elapsed.

use std::time::Duration;

use tokio::time::Instant;

/// Rate window state
#[derive(Debug, Clone)]
pub struct RateWindow {
    last_success_at: Option<Instant>,
    min_interval: Duration,
}

/// Rate limit check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Zero when allowed
    pub retry_after: Duration,
}

impl RateWindow {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_success_at: None,
            min_interval,
        }
    }

    /// Check whether a new call may start at `now`
    pub fn check(&self, now: Instant) -> RateLimitResult {
        let Some(last) = self.last_success_at else {
            return RateLimitResult {
                allowed: true,
                retry_after: Duration::ZERO,
            };
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.min_interval {
            RateLimitResult {
                allowed: true,
                retry_after: Duration::ZERO,
            }
        } else {
            RateLimitResult {
                allowed: false,
                retry_after: self.min_interval - elapsed,
            }
        }
    }

    /// Record a successful call completing at `now`
    pub fn record_success(&mut self, now: Instant) {
        self.last_success_at = Some(now);
    }

    pub fn last_success_at(&self) -> Option<Instant> {
        self.last_success_at
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
