//! Auth (Authenticated Requests) Client Module
//!
//! Clean Architecture structure:
//! - `domain/` - Credentials and token pairs
//! - `application/` - Request client, refresh single-flight, OTP sign-in
//! - `infra/` - Credential persistence and wire DTOs
//!
//! ## Token Model
//! - Access and refresh tokens live in durable key-value storage
//! - Only a successful sign-in or refresh writes them
//! - A 401 triggers at most one shared refresh and one retry per request
//! - Unrecoverable 401s clear the tokens and broadcast `SessionEvent::Expired`

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::ClientConfig;
pub use application::request_client::{RequestClient, RequestOptions};
pub use application::sign_in::{OtpSignInInput, OtpSignInUseCase};
pub use domain::credentials::{Credentials, TokenPair};
pub use error::{ClientError, ClientResult};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
