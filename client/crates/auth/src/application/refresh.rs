//! Token Refresh Single-Flight
//!
//! At most one refresh exchange runs at a time. Every 401 that arrives while
//! one is pending awaits the same shared outcome. The exchange runs on its own
//! task so it completes (and persists or clears tokens) even if every waiter
//! is cancelled.
//!
//! A failed refresh remembers the access token it was started for. A 401 for
//! that token arriving after the failure has settled reports `RefreshFailed`
//! again without a second expiry broadcast.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use kernel::error::kind::ErrorKind;
use platform::events::{SessionEvent, SessionEvents};

use crate::application::config::ClientConfig;
use crate::domain::credentials::TokenPair;
use crate::error::{ClientError, ClientResult};
use crate::infra::credential_store::CredentialStore;
use crate::infra::dto::{RefreshRequest, TokenResponse};

type SharedRefresh = Shared<BoxFuture<'static, ClientResult<TokenPair>>>;

pub(crate) struct RefreshCoordinator {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credentials: CredentialStore,
    events: SessionEvents,
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
    generation: AtomicU64,
    /// Access token whose refresh last failed
    expired_access: Mutex<Option<String>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        http: reqwest::Client,
        config: Arc<ClientConfig>,
        credentials: CredentialStore,
        events: SessionEvents,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
            events,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            expired_access: Mutex::new(None),
        }
    }

    /// Join the pending refresh or start one for a request that was sent
    /// with `sent_with`.
    ///
    /// Without a refresh token the access token is cleared and the call
    /// fails with `NoRefreshToken` without touching the network, unless
    /// `sent_with` already went through a failed refresh.
    pub(crate) async fn refresh(
        self: &Arc<Self>,
        sent_with: Option<&str>,
    ) -> ClientResult<TokenPair> {
        let pending = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let joined = slot.as_ref().map(|(_, pending)| pending.clone());
            match joined {
                Some(pending) => {
                    tracing::debug!("Joining in-flight token refresh");
                    pending
                }
                None => match self.credentials.refresh_token()? {
                    Some(refresh_token) => {
                        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                        let access_token = self.credentials.access_token()?;
                        let pending = self.spawn_exchange(generation, refresh_token, access_token);
                        *slot = Some((generation, pending.clone()));
                        pending
                    }
                    None => {
                        drop(slot);
                        if self.already_expired(sent_with) {
                            tracing::debug!("Refresh for this access token already failed");
                            return Err(ClientError::RefreshFailed {
                                message: "session already expired".to_string(),
                            });
                        }
                        return Err(self.expire_without_refresh_token());
                    }
                },
            }
        };

        pending.await
    }

    fn spawn_exchange(
        self: &Arc<Self>,
        generation: u64,
        refresh_token: String,
        access_token: Option<String>,
    ) -> SharedRefresh {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome = this.exchange(refresh_token).await;
            let outcome = this.settle(outcome, access_token);
            this.release(generation);
            outcome
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(ClientError::RefreshFailed {
                    message: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }

    async fn exchange(&self, refresh_token: String) -> ClientResult<TokenPair> {
        tracing::debug!("Exchanging refresh token");
        let url = self.config.url(&self.config.refresh_path);

        let response = self
            .http
            .post(url)
            .timeout(self.config.refresh_timeout)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| ClientError::RefreshFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RefreshFailed {
                message: format!("refresh rejected with status {}", status.as_u16()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| ClientError::RefreshFailed {
            message: e.to_string(),
        })?;

        Ok(TokenPair {
            access_token: body.access_token,
            refresh_token: body.refresh_token.unwrap_or(refresh_token),
        })
    }

    /// Persist the new pair, or clear everything and broadcast on failure.
    fn settle(
        &self,
        outcome: ClientResult<TokenPair>,
        access_token: Option<String>,
    ) -> ClientResult<TokenPair> {
        let mut expired = self.expired_access.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(pair) => {
                *expired = None;
                self.credentials.save(&pair)?;
                tracing::info!("Access token refreshed");
                Ok(pair)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, clearing credentials");
                if let Err(e) = self.credentials.clear_all() {
                    tracing::error!(error = %e, "Failed to clear credentials");
                }
                *expired = access_token;
                self.events.publish(SessionEvent::Expired {
                    reason: ErrorKind::RefreshFailed,
                });
                Err(err)
            }
        }
    }

    fn release(&self, generation: u64) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(g, _)| *g == generation) {
            *slot = None;
        }
    }

    fn already_expired(&self, sent_with: Option<&str>) -> bool {
        let expired = self.expired_access.lock().unwrap_or_else(PoisonError::into_inner);
        sent_with.is_some() && expired.as_deref() == sent_with
    }

    fn expire_without_refresh_token(&self) -> ClientError {
        tracing::warn!("Received 401 without a refresh token, clearing access token");
        if let Err(e) = self.credentials.clear_access() {
            tracing::error!(error = %e, "Failed to clear access token");
        }
        self.events.publish(SessionEvent::Expired {
            reason: ErrorKind::NoRefreshToken,
        });
        ClientError::NoRefreshToken
    }
}
