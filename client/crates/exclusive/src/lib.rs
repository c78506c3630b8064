//! Exclusive (Activation Flow) Module
//!
//! Clean Architecture structure:
//! - `domain/` - Session entity, flow stages, transition table, API trait
//! - `application/` - Session machine, countdown, proximity guard
//! - `infra/` - HTTP API adapter and reservation id storage
//!
//! ## Flow
//! ```text
//! idle -> activated -> walking -> at_merchant -> [preferences] -> completed -> idle
//! ```
//! - The countdown starts at activation and runs through `at_merchant`
//! - Proximity is polled only while walking
//! - Preferences are offered once per application session
//! - Leaving the flow deletes the reservation id

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::ExclusiveConfig;
pub use application::countdown::Countdown;
pub use application::proximity_guard::{ProximityGuard, ProximityObserver};
pub use application::session_flags::AppSessionFlags;
pub use application::session_machine::{ActivateInput, SessionMachine};
pub use domain::entities::{ExclusiveSession, Feedback, FlowState};
pub use domain::repository::ExclusiveApi;
pub use domain::value_objects::{FlowAction, FlowStage, ProximitySignal, ReservationId};
pub use error::{ExclusiveError, ExclusiveResult};
pub use infra::http_api::HttpExclusiveApi;
pub use infra::reservation_store::ReservationStore;

#[cfg(test)]
mod tests;
