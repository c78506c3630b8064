//! Domain Layer
//!
//! Credential value types.

pub mod credentials;
