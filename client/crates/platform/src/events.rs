//! Process-wide Session Events
//!
//! Fire-and-forget notifications that independent UI surfaces subscribe to
//! without being wired to each other.

use kernel::error::kind::ErrorKind;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 16;

/// Session lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were dropped after an unrecoverable 401
    Expired { reason: ErrorKind },
}

/// Broadcast hub for [`SessionEvent`]s
///
/// Cheap to clone; every clone publishes to the same subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers received it.
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        tracing::info!(event = ?event, "Publishing session event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
