//! Error conversions - From implementations for common error types
//!
//! Conversions for failures that reach the UI shell without a crate error
//! in between (local file I/O, response decoding).

use super::app_error::AppError;
use super::kind::ErrorKind;

// ============================================================================
// Standard library conversions
// ============================================================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let action = match err.kind() {
            std::io::ErrorKind::PermissionDenied => "Check that the storage file is writable",
            _ => "Restart the app",
        };
        AppError::internal("Local storage is unavailable")
            .with_action(action)
            .with_source(err)
    }
}

// ============================================================================
// serde_json conversions
// ============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::new(ErrorKind::ServerError, format!("Unexpected response format: {err}"))
                .with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}
