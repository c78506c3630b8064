//! Application Session Flags
//!
//! In-memory, per-process flags. Never persisted: a restart is a new
//! application session.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flags shared by every exclusive flow in this application session
#[derive(Debug, Default)]
pub struct AppSessionFlags {
    preferences_shown: AtomicBool,
}

impl AppSessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preferences_shown(&self) -> bool {
        self.preferences_shown.load(Ordering::Acquire)
    }

    /// Mark preferences as shown. Returns `true` only for the first caller.
    pub fn claim_preferences(&self) -> bool {
        !self.preferences_shown.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let flags = AppSessionFlags::new();
        assert!(!flags.preferences_shown());
        assert!(flags.claim_preferences());
        assert!(!flags.claim_preferences());
        assert!(flags.preferences_shown());
    }
}
