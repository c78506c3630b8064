//! Nearby (Intent Capture) Module
//!
//! Clean Architecture structure:
//! - `domain/` - Nearby merchants and charger summary
//! - `application/` - Geo-keyed cache and the intent capture use case
//! - `infra/` - Wire DTOs
//!
//! ## Cache Model
//! - Keys are coordinates rounded to 4 decimals (~11 m)
//! - Fresh entries (younger than the TTL) are served without a network call
//! - Concurrent lookups for one key share a single request
//! - A successful fetch opens a minimum interval during which no new fetch
//!   of any key starts; callers get the newest fresh entry or `RateLimited`

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::GeoCacheConfig;
pub use application::geo_cache::GeoCache;
pub use application::intent_capture::{IntentCaptureInput, IntentCaptureUseCase};
pub use domain::intent::{ChargerSummary, IntentCapture, NearbyMerchant};
pub use error::{NearbyError, NearbyResult};
