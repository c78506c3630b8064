//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations for the client:
//! - Durable key-value storage (memory and file backed)
//! - Process-wide session events
//! - Geocoordinates, quantized cache keys and great-circle distance
//! - Async location sources with explicit timeouts
//! - Cancellable periodic tasks
//! - Rate window bookkeeping
//! - Random human-readable codes

pub mod events;
pub mod geo;
pub mod location;
pub mod random;
pub mod rate_limit;
pub mod storage;
pub mod task;
