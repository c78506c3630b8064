//! Client Error Types
//!
//! This module provides request-client error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! `ClientError` is `Clone` because a single refresh outcome is shared by
//! every request waiting on it.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::storage::StorageError;
use thiserror::Error;

/// Client-specific result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// Request client error variants
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Transport failure (DNS, offline, timeout); status 0
    #[error("{message}")]
    Network { message: String },

    /// 401 with no refresh token to exchange
    #[error("Session expired: no refresh token")]
    NoRefreshToken,

    /// 401 and the refresh exchange was rejected or failed
    #[error("Session expired: {message}")]
    RefreshFailed { message: String },

    /// Non-2xx response
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        /// Machine-readable `error` field of the body, if any
        code: Option<String>,
    },

    /// 2xx response whose body could not be decoded
    #[error("invalid response body")]
    InvalidResponse { status: u16, message: String },

    /// Rejected locally before any network call
    #[error("{0}")]
    Invalid(String),

    /// Credential storage failure
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// HTTP client could not be constructed
    #[error("HTTP client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network { .. } => ErrorKind::NetworkError,
            ClientError::NoRefreshToken => ErrorKind::NoRefreshToken,
            ClientError::RefreshFailed { .. } => ErrorKind::RefreshFailed,
            ClientError::Http { status, .. } => ErrorKind::from_status(*status),
            ClientError::InvalidResponse { .. } => ErrorKind::ServerError,
            ClientError::Invalid(_) => ErrorKind::Validation,
            ClientError::Storage(_) | ClientError::Config(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status as seen by the caller (0 for transport failures)
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Http { status, .. } | ClientError::InvalidResponse { status, .. } => {
                *status
            }
            _ => self.kind().default_status(),
        }
    }

    /// Whether the user has to sign in again
    pub fn is_session_expired(&self) -> bool {
        self.kind().is_session_expired()
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string()).with_status(self.status());
        if self.is_session_expired() {
            err.with_action("Sign in again")
        } else {
            err
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network {
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for ClientError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Credential storage error");
        ClientError::Storage(err.to_string())
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        err.to_app_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status() {
        let err = ClientError::Network {
            message: "connection refused".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(err.status(), 0);

        assert_eq!(ClientError::NoRefreshToken.status(), 401);
        assert_eq!(ClientError::NoRefreshToken.kind(), ErrorKind::NoRefreshToken);

        let err = ClientError::Http {
            status: 422,
            message: "bad phone".into(),
            code: None,
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status(), 422);

        let err = ClientError::Http {
            status: 401,
            message: "Unauthorized".into(),
            code: None,
        };
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_invalid_response_message() {
        let err = ClientError::InvalidResponse {
            status: 200,
            message: "expected value at line 1".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.to_string(), "invalid response body");
    }

    #[test]
    fn test_app_error_conversion() {
        let app: AppError = ClientError::RefreshFailed {
            message: "rejected".into(),
        }
        .into();
        assert_eq!(app.kind(), ErrorKind::RefreshFailed);
        assert_eq!(app.status(), 401);
        assert!(app.is_session_expired());
        assert_eq!(app.action(), Some("Sign in again"));
    }
}
