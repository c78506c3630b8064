//! Application Layer

pub mod config;
pub mod geo_cache;
pub mod intent_capture;

// Re-exports
pub use config::GeoCacheConfig;
pub use geo_cache::GeoCache;
pub use intent_capture::{IntentCaptureInput, IntentCaptureUseCase};
