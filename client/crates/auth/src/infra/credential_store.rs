//! Credential Store
//!
//! Tokens in durable key-value storage. Writes are crate-private: only the
//! refresh path and the sign-in/sign-out operations may change them.

use std::sync::Arc;

use platform::storage::{KeyValueStore, StorageError};

use crate::domain::credentials::{Credentials, TokenPair};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Token persistence over a [`KeyValueStore`]
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Credentials, StorageError> {
        Ok(Credentials {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
        })
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    pub(crate) fn save(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }

    pub(crate) fn clear_access(&self) -> Result<(), StorageError> {
        self.store.remove(ACCESS_TOKEN_KEY)
    }

    pub(crate) fn clear_all(&self) -> Result<(), StorageError> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)
    }
}
