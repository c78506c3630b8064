//! Application Layer

pub mod config;
pub mod countdown;
pub mod proximity_guard;
pub mod session_flags;
pub mod session_machine;

// Re-exports
pub use config::ExclusiveConfig;
pub use session_machine::SessionMachine;
