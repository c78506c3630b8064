//! Nearby Error Types
//!
//! This module provides nearby-lookup error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::time::Duration;

use auth::ClientError;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Nearby-specific result type alias
pub type NearbyResult<T> = Result<T, NearbyError>;

/// Nearby-specific error variants
///
/// `Clone` so every caller sharing an in-flight lookup gets the same error.
#[derive(Debug, Clone, Error)]
pub enum NearbyError {
    /// Minimum interval since the last successful lookup has not elapsed
    /// and no fresh cached result exists
    #[error("Nearby lookups are rate limited, retry in {}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    /// Coordinate outside the valid latitude/longitude range
    #[error("Invalid coordinate: {lat}, {lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// The underlying request failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The lookup task ended without a result
    #[error("Nearby lookup aborted: {0}")]
    Aborted(String),
}

impl NearbyError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            NearbyError::RateLimited { .. } => ErrorKind::RateLimited,
            NearbyError::InvalidCoordinate { .. } => ErrorKind::Validation,
            NearbyError::Client(err) => err.kind(),
            NearbyError::Aborted(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            NearbyError::Client(err) => err.status(),
            _ => self.kind().default_status(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind().is_session_expired()
    }
}

impl From<NearbyError> for AppError {
    fn from(err: NearbyError) -> Self {
        match err {
            NearbyError::Client(err) => err.into(),
            NearbyError::RateLimited { retry_after } => {
                AppError::rate_limited(err.to_string()).with_action(format!(
                    "Try again in {} seconds",
                    retry_after.as_secs().max(1)
                ))
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
