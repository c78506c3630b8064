//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of the client vocabulary:
//! - The error taxonomy shared by every layer and the unified error type
//! - Typed identifiers for server-side entities
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all crates.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
