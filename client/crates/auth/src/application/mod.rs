//! Application Layer
//!
//! Request orchestration and use cases.

pub mod config;
pub mod refresh;
pub mod request_client;
pub mod sign_in;

// Re-exports
pub use config::ClientConfig;
pub use request_client::{RequestClient, RequestOptions};
pub use sign_in::{OtpSignInInput, OtpSignInUseCase};
