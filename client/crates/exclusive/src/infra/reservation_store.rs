//! Reservation Store
//!
//! Reservation ids in durable storage under `reservation_id_<sessionId>`.
//! One id per exclusive session, stable until the session ends.

use std::sync::Arc;

use kernel::id::ExclusiveSessionId;
use platform::storage::{KeyValueStore, StorageError};

use crate::domain::value_objects::ReservationId;

pub const RESERVATION_KEY_PREFIX: &str = "reservation_id_";

/// Reservation id persistence over a [`KeyValueStore`]
#[derive(Clone)]
pub struct ReservationStore {
    store: Arc<dyn KeyValueStore>,
}

impl ReservationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key(session_id: &ExclusiveSessionId) -> String {
        format!("{RESERVATION_KEY_PREFIX}{session_id}")
    }

    pub fn get(
        &self,
        session_id: &ExclusiveSessionId,
    ) -> Result<Option<ReservationId>, StorageError> {
        Ok(self
            .store
            .get(&Self::key(session_id))?
            .map(ReservationId::from_stored))
    }

    /// The stored id for `session_id`, generating and storing one if absent
    pub fn get_or_create(
        &self,
        session_id: &ExclusiveSessionId,
    ) -> Result<ReservationId, StorageError> {
        if let Some(existing) = self.get(session_id)? {
            return Ok(existing);
        }
        let id = ReservationId::generate();
        self.store.set(&Self::key(session_id), id.as_str())?;
        tracing::debug!(session_id = %session_id, "Reservation id created");
        Ok(id)
    }

    pub fn remove(&self, session_id: &ExclusiveSessionId) -> Result<(), StorageError> {
        self.store.remove(&Self::key(session_id))
    }

    /// Session ids that currently have a reservation
    pub fn session_ids(&self) -> Result<Vec<ExclusiveSessionId>, StorageError> {
        Ok(self
            .store
            .keys_with_prefix(RESERVATION_KEY_PREFIX)?
            .into_iter()
            .filter_map(|key| {
                key.strip_prefix(RESERVATION_KEY_PREFIX)
                    .map(ExclusiveSessionId::from)
            })
            .collect())
    }

    /// Remove reservations left behind by sessions that are no longer active
    pub fn purge_except(&self, active: Option<&ExclusiveSessionId>) -> Result<usize, StorageError> {
        let mut purged = 0;
        for session_id in self.session_ids()? {
            if Some(&session_id) != active {
                self.remove(&session_id)?;
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::info!(purged, "Purged stale reservation ids");
        }
        Ok(purged)
    }
}
