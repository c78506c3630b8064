//! Session Machine
//!
//! Drives one exclusive from activation to completion. Owns the countdown
//! and the proximity observation, so dropping the machine or leaving the
//! stages that need them cancels both.
//!
//! Failed server calls leave the stage unchanged and are kept as a
//! dismissable error. Session-expiry errors end the flow instead.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{ChargerId, MerchantId};
use platform::geo::{Coordinate, GeoSample};
use platform::location::{LocationSource, TimedLocation};
use platform::storage::KeyValueStore;
use tokio::sync::watch;

use crate::application::config::ExclusiveConfig;
use crate::application::countdown::Countdown;
use crate::application::proximity_guard::{ProximityGuard, ProximityObserver};
use crate::application::session_flags::AppSessionFlags;
use crate::domain::entities::{ActivationRequest, ExclusiveSession, Feedback, FlowState};
use crate::domain::repository::ExclusiveApi;
use crate::domain::services::transition;
use crate::domain::value_objects::{FlowAction, FlowStage, ProximitySignal, ReservationId};
use crate::error::{ExclusiveError, ExclusiveResult};
use crate::infra::reservation_store::ReservationStore;

/// Activation input
#[derive(Debug, Clone)]
pub struct ActivateInput {
    pub merchant_id: MerchantId,
    pub charger_id: ChargerId,
    /// Where arrival is checked against
    pub merchant_location: Coordinate,
}

/// Exclusive flow state machine
pub struct SessionMachine<A, L> {
    api: Arc<A>,
    location: Arc<TimedLocation<L>>,
    guard: ProximityGuard<TimedLocation<L>>,
    reservations: ReservationStore,
    flags: Arc<AppSessionFlags>,
    config: ExclusiveConfig,
    state: FlowState,
    countdown: Option<Countdown>,
    observer: Option<ProximityObserver>,
    last_error: Option<ExclusiveError>,
}

impl<A, L> SessionMachine<A, L>
where
    A: ExclusiveApi,
    L: LocationSource + Send + Sync + 'static,
{
    pub fn new(
        api: Arc<A>,
        location: L,
        store: Arc<dyn KeyValueStore>,
        flags: Arc<AppSessionFlags>,
        config: ExclusiveConfig,
    ) -> Self {
        let location = Arc::new(TimedLocation::new(location, config.location_timeout));
        Self {
            api,
            guard: ProximityGuard::new(location.clone()),
            location,
            reservations: ReservationStore::new(store),
            flags,
            config,
            state: FlowState::Idle,
            countdown: None,
            observer: None,
            last_error: None,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn stage(&self) -> FlowStage {
        self.state.stage()
    }

    pub fn session(&self) -> Option<&ExclusiveSession> {
        self.state.session()
    }

    /// Whether `action` is allowed in the current stage
    pub fn can(&self, action: FlowAction) -> bool {
        self.next_stage(action).is_some()
    }

    /// Seconds left, while the stage carries a countdown
    pub fn remaining_seconds(&self) -> Option<u32> {
        if !self.stage().has_countdown() {
            return None;
        }
        self.countdown.as_ref().map(Countdown::remaining)
    }

    pub fn countdown_updates(&self) -> Option<watch::Receiver<u32>> {
        self.countdown.as_ref().map(Countdown::subscribe)
    }

    /// Latest proximity reading, while walking
    pub fn proximity(&self) -> Option<ProximitySignal> {
        self.observer.as_ref().map(ProximityObserver::latest)
    }

    pub fn proximity_updates(&self) -> Option<watch::Receiver<ProximitySignal>> {
        self.observer.as_ref().map(ProximityObserver::subscribe)
    }

    /// Reservation id of the active session.
    ///
    /// Stable for the life of the session; `None` when idle or once the
    /// countdown has run out.
    pub fn reservation_id(&self) -> ExclusiveResult<Option<ReservationId>> {
        let Some(session) = self.state.session() else {
            return Ok(None);
        };
        if self.countdown.as_ref().is_some_and(Countdown::is_expired) {
            return Ok(None);
        }
        Ok(Some(self.reservations.get_or_create(&session.id)?))
    }

    pub fn last_error(&self) -> Option<&ExclusiveError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// idle -> activated
    pub async fn activate(&mut self, input: ActivateInput) -> ExclusiveResult<()> {
        self.check(FlowAction::Activate)?;
        self.last_error = None;

        let request = ActivationRequest {
            merchant_id: input.merchant_id.clone(),
            charger_id: input.charger_id.clone(),
            geo: self.best_effort_location().await,
        };
        let activated = match self.api.activate(request).await {
            Ok(activated) => activated,
            Err(err) => return Err(self.fail(FlowAction::Activate, err)),
        };

        let session = ExclusiveSession {
            id: activated.id,
            merchant_id: input.merchant_id,
            charger_id: input.charger_id,
            merchant_location: input.merchant_location,
            activated_at: Utc::now(),
            expires_at: activated.expires_at,
            remaining_seconds: activated.remaining_seconds,
        };

        // Only one exclusive at a time; anything else in storage is stale
        let reserved = self
            .reservations
            .get_or_create(&session.id)
            .and_then(|_| self.reservations.purge_except(Some(&session.id)));
        if let Err(err) = reserved {
            tracing::warn!(error = %err, "Failed to store reservation id");
        }

        self.countdown = Some(self.start_countdown(&session));

        tracing::info!(
            session_id = %session.id,
            merchant_id = %session.merchant_id,
            remaining_seconds = session.remaining_seconds,
            "Exclusive activated"
        );
        self.state = FlowState::Activated { session };
        Ok(())
    }

    /// activated -> walking; starts proximity polling, which runs until
    /// arrival, teardown or the countdown reaching zero
    pub fn start_walking(&mut self) -> ExclusiveResult<()> {
        let next = self.check(FlowAction::StartWalking)?;
        let next_state = self.advanced(FlowAction::StartWalking, next)?;

        if let Some(session) = next_state.session() {
            // polling ends with the countdown
            let remaining = self.countdown_updates();
            let running = move || remaining.as_ref().is_none_or(|rx| *rx.borrow() > 0);
            self.observer = Some(self.guard.observe_while(
                session.merchant_location,
                self.config.arrival_radius_m,
                self.config.proximity_poll_interval,
                running,
            ));
        }

        self.enter(next_state);
        Ok(())
    }

    /// walking -> at_merchant, once the guard reports the user near
    pub async fn confirm_arrival(&mut self) -> ExclusiveResult<()> {
        self.check(FlowAction::ConfirmArrival)?;
        self.last_error = None;

        if self.countdown.as_ref().is_some_and(Countdown::is_expired) {
            return Err(self.reject(ExclusiveError::Expired));
        }

        let signal = self.proximity().unwrap_or(ProximitySignal::unknown());
        match signal.distance_meters {
            None => return Err(self.reject(ExclusiveError::ProximityUnknown)),
            Some(distance_meters) if !signal.is_near => {
                return Err(self.reject(ExclusiveError::NotNear {
                    distance_meters,
                    radius_meters: self.config.arrival_radius_m,
                }));
            }
            Some(_) => {}
        }

        let Some(session) = self.state.session().cloned() else {
            return Err(self.illegal(FlowAction::ConfirmArrival));
        };

        let geo = self.best_effort_location().await;
        let verification = match self.api.verify(session.id.clone(), geo).await {
            Ok(verification) => verification,
            Err(err) => return Err(self.fail(FlowAction::ConfirmArrival, err)),
        };

        self.stop_observer();
        self.enter(FlowState::AtMerchant {
            session,
            verification_code: verification.verification_code,
        });
        Ok(())
    }

    /// at_merchant -> preferences (first time this app session) or completed
    pub fn dismiss_verification(&mut self) -> ExclusiveResult<FlowStage> {
        self.check(FlowAction::DismissVerification)?;

        let show_preferences = self.flags.claim_preferences();
        let next = transition(self.stage(), FlowAction::DismissVerification, show_preferences)
            .ok_or_else(|| self.illegal(FlowAction::DismissVerification))?;
        let next_state = self.advanced(FlowAction::DismissVerification, next)?;

        if let Some(countdown) = self.countdown.as_mut() {
            countdown.stop();
        }
        self.enter(next_state);
        Ok(next)
    }

    /// preferences -> completed
    pub fn close_preferences(&mut self) -> ExclusiveResult<()> {
        let next = self.check(FlowAction::ClosePreferences)?;
        let next_state = self.advanced(FlowAction::ClosePreferences, next)?;
        self.enter(next_state);
        Ok(())
    }

    /// completed -> idle; returns the server status
    pub async fn complete(&mut self, feedback: Option<Feedback>) -> ExclusiveResult<String> {
        self.check(FlowAction::Continue)?;
        self.last_error = None;

        if feedback.as_ref().is_some_and(|f| !f.is_valid()) {
            return Err(self.reject(ExclusiveError::InvalidFeedback(
                "rating must be between 1 and 5".into(),
            )));
        }

        let Some(session_id) = self.state.session().map(|s| s.id.clone()) else {
            return Err(self.illegal(FlowAction::Continue));
        };

        let status = match self.api.complete(session_id.clone(), feedback).await {
            Ok(status) => status,
            Err(err) => return Err(self.fail(FlowAction::Continue, err)),
        };

        self.teardown();
        tracing::info!(session_id = %session_id, status = %status, "Exclusive completed");
        Ok(status)
    }

    /// Leave the flow from any stage
    pub fn abandon(&mut self) {
        if self.stage() == FlowStage::Idle {
            return;
        }
        tracing::info!(from = %self.stage(), "Exclusive abandoned");
        self.teardown();
    }

    /// Another surface saw the session-expired broadcast
    pub fn on_session_expired(&mut self) {
        if self.stage() != FlowStage::Idle {
            tracing::warn!(from = %self.stage(), "Session expired, leaving exclusive flow");
        }
        self.teardown();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_stage(&self, action: FlowAction) -> Option<FlowStage> {
        transition(self.stage(), action, !self.flags.preferences_shown())
    }

    fn check(&self, action: FlowAction) -> ExclusiveResult<FlowStage> {
        self.next_stage(action).ok_or_else(|| self.illegal(action))
    }

    fn illegal(&self, action: FlowAction) -> ExclusiveError {
        tracing::debug!(from = %self.stage(), action = %action, "Rejected illegal transition");
        ExclusiveError::IllegalTransition {
            from: self.stage(),
            action,
        }
    }

    fn advanced(&self, action: FlowAction, next: FlowStage) -> ExclusiveResult<FlowState> {
        self.state.advance(next).ok_or_else(|| self.illegal(action))
    }

    fn enter(&mut self, next: FlowState) {
        tracing::info!(from = %self.stage(), to = %next.stage(), "Exclusive flow transition");
        self.state = next;
    }

    /// Local rejection: keep the stage, remember the error
    fn reject(&mut self, err: ExclusiveError) -> ExclusiveError {
        tracing::debug!(code = err.code(), "Exclusive action rejected");
        self.last_error = Some(err.clone());
        err
    }

    /// Server call failure
    fn fail(&mut self, action: FlowAction, err: ExclusiveError) -> ExclusiveError {
        if err.is_session_expired() {
            tracing::warn!(
                action = %action,
                code = err.code(),
                "Session expired during exclusive flow"
            );
            self.teardown();
        } else {
            tracing::warn!(action = %action, error = %err, "Exclusive action failed");
        }
        self.last_error = Some(err.clone());
        err
    }

    fn start_countdown(&self, session: &ExclusiveSession) -> Countdown {
        let reservations = self.reservations.clone();
        let session_id = session.id.clone();
        Countdown::start(session.remaining_seconds, self.config.countdown_tick, move || {
            match reservations.remove(&session_id) {
                Ok(()) => {
                    tracing::info!(session_id = %session_id, "Reservation released on expiry")
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to release reservation on expiry")
                }
            }
        })
    }

    async fn best_effort_location(&self) -> Option<GeoSample> {
        match self.location.current_position().await {
            Ok(sample) => Some(sample),
            Err(err) => {
                tracing::info!(error = %err, "Continuing without location");
                None
            }
        }
    }

    fn stop_observer(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.stop();
        }
    }

    /// Stop timers, drop the reservation, return to idle
    fn teardown(&mut self) {
        self.stop_observer();
        if let Some(mut countdown) = self.countdown.take() {
            countdown.stop();
        }
        if let Some(session) = self.state.session()
            && let Err(err) = self.reservations.remove(&session.id)
        {
            tracing::warn!(error = %err, "Failed to remove reservation id");
        }
        self.state = FlowState::Idle;
    }
}
