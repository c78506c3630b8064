//! Infrastructure Layer
//!
//! Credential persistence on top of the platform key-value store, and the
//! JSON shapes exchanged with the auth endpoints.

pub mod credential_store;
pub mod dto;
