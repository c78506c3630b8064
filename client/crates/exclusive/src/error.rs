//! Exclusive Error Types
//!
//! This module provides flow error variants that integrate
//! with the unified `kernel::error::AppError` system.

use auth::ClientError;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::storage::StorageError;
use thiserror::Error;

use crate::domain::value_objects::{FlowAction, FlowStage};

/// Exclusive-specific result type alias
pub type ExclusiveResult<T> = Result<T, ExclusiveError>;

/// Exclusive-specific error variants
#[derive(Debug, Clone, Error)]
pub enum ExclusiveError {
    /// Action not allowed in the current stage
    #[error("Cannot {action} while {from}")]
    IllegalTransition { from: FlowStage, action: FlowAction },

    /// Arrival confirmed while still too far away
    #[error("Still {distance_meters:.0} m away, get within {radius_meters:.0} m")]
    NotNear {
        distance_meters: f64,
        radius_meters: f64,
    },

    /// Device position unknown (permission denied or timed out)
    #[error("Your location is unavailable")]
    ProximityUnknown,

    /// The countdown reached zero
    #[error("This exclusive has expired")]
    Expired,

    /// Feedback failed local validation
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// Server call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reservation storage failure
    #[error("Reservation storage error: {0}")]
    Storage(String),
}

impl ExclusiveError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExclusiveError::IllegalTransition { .. }
            | ExclusiveError::NotNear { .. }
            | ExclusiveError::Expired
            | ExclusiveError::InvalidFeedback(_) => ErrorKind::Validation,
            ExclusiveError::ProximityUnknown => ErrorKind::ProximityUnknown,
            ExclusiveError::Client(err) => err.kind(),
            ExclusiveError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable code for local errors, the kind code otherwise
    pub fn code(&self) -> &'static str {
        match self {
            ExclusiveError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            ExclusiveError::NotNear { .. } => "NOT_NEAR",
            ExclusiveError::Expired => "EXPIRED",
            _ => self.kind().code(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ExclusiveError::Client(err) => err.status(),
            _ => self.kind().default_status(),
        }
    }

    /// Errors that end the flow and route the user to sign in
    pub fn is_session_expired(&self) -> bool {
        self.kind().is_session_expired()
    }
}

impl From<StorageError> for ExclusiveError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Reservation storage error");
        ExclusiveError::Storage(err.to_string())
    }
}

impl From<ExclusiveError> for AppError {
    fn from(err: ExclusiveError) -> Self {
        match err {
            ExclusiveError::Client(err) => err.into(),
            ExclusiveError::ProximityUnknown => {
                AppError::new(ErrorKind::ProximityUnknown, err.to_string())
                    .with_action("Allow location access and try again")
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
