//! Device Location
//!
//! Async location sources. Platform geolocation APIs are callback based and
//! may never answer, so every consumer goes through [`TimedLocation`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::geo::{Coordinate, GeoSample};

/// Location lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user or OS denied location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// No fix could be obtained
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    /// The source did not answer in time
    #[error("Location request timed out")]
    Timeout,
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        AppError::new(ErrorKind::ProximityUnknown, err.to_string())
    }
}

/// Source of device positions
#[trait_variant::make(LocationSource: Send)]
pub trait LocalLocationSource {
    /// Take one position reading
    async fn current_position(&self) -> Result<GeoSample, LocationError>;
}

impl<L> LocationSource for Arc<L>
where
    L: LocationSource + Send + Sync,
{
    async fn current_position(&self) -> Result<GeoSample, LocationError> {
        (**self).current_position().await
    }
}

/// Wraps a source with a hard timeout
#[derive(Debug)]
pub struct TimedLocation<L> {
    inner: L,
    timeout: Duration,
}

impl<L> TimedLocation<L> {
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L> LocationSource for TimedLocation<L>
where
    L: LocationSource + Sync,
{
    async fn current_position(&self) -> Result<GeoSample, LocationError> {
        match tokio::time::timeout(self.timeout, self.inner.current_position()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "Location timed out");
                Err(LocationError::Timeout)
            }
        }
    }
}

/// Manually positioned source
///
/// Used by the CLI (position from flags) and by tests that walk a device
/// towards a target.
#[derive(Debug)]
pub struct FixedLocation {
    state: Mutex<Result<(Coordinate, Option<f64>), LocationError>>,
}

impl FixedLocation {
    pub fn new(coordinate: Coordinate, accuracy_meters: Option<f64>) -> Self {
        Self {
            state: Mutex::new(Ok((coordinate, accuracy_meters))),
        }
    }

    /// A source that always fails with `error`
    pub fn failing(error: LocationError) -> Self {
        Self {
            state: Mutex::new(Err(error)),
        }
    }

    /// Move the device
    pub fn set(&self, coordinate: Coordinate, accuracy_meters: Option<f64>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) =
            Ok((coordinate, accuracy_meters));
    }

    /// Make subsequent readings fail
    pub fn fail(&self, error: LocationError) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Err(error);
    }
}

impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Result<GeoSample, LocationError> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        state.map(|(coordinate, accuracy)| GeoSample::new(coordinate, accuracy))
    }
}
