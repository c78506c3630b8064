//! Unit tests for the exclusive flow
//! Drives the session machine against a scripted API and a hand-moved device.

#[cfg(test)]
mod fixtures {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use kernel::id::ExclusiveSessionId;
    use platform::geo::{Coordinate, GeoSample};
    use platform::location::FixedLocation;
    use platform::storage::{KeyValueStore, MemoryStore};

    use crate::application::session_machine::ActivateInput;
    use crate::domain::entities::{ActivatedExclusive, ActivationRequest, Feedback, Verification};
    use crate::domain::repository::ExclusiveApi;
    use crate::error::{ExclusiveError, ExclusiveResult};
    use crate::{AppSessionFlags, ExclusiveConfig, SessionMachine};

    pub const TACO_STAND: Coordinate = Coordinate::new(30.2672, -97.7431);
    /// About 310 m north of the taco stand
    pub const DOWN_THE_BLOCK: Coordinate = Coordinate::new(30.2700, -97.7431);
    /// About 11 m from the taco stand
    pub const AT_THE_DOOR: Coordinate = Coordinate::new(30.2673, -97.7431);

    /// Scripted exclusive endpoints
    #[derive(Default)]
    pub struct FakeApi {
        pub calls: Mutex<Vec<&'static str>>,
        pub geos: Mutex<Vec<Option<GeoSample>>>,
        pub feedback: Mutex<Vec<Option<Feedback>>>,
        pub activate_failures: Mutex<VecDeque<ExclusiveError>>,
        pub verify_failures: Mutex<VecDeque<ExclusiveError>>,
        sessions: AtomicU32,
    }

    impl FakeApi {
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fail_next_activate(&self, err: ExclusiveError) {
            self.activate_failures.lock().unwrap().push_back(err);
        }

        pub fn fail_next_verify(&self, err: ExclusiveError) {
            self.verify_failures.lock().unwrap().push_back(err);
        }
    }

    impl ExclusiveApi for FakeApi {
        async fn activate(
            &self,
            request: ActivationRequest,
        ) -> ExclusiveResult<ActivatedExclusive> {
            self.calls.lock().unwrap().push("activate");
            self.geos.lock().unwrap().push(request.geo);
            if let Some(err) = self.activate_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ActivatedExclusive {
                id: ExclusiveSessionId::new(format!("ex_{n}")),
                expires_at: None,
                remaining_seconds: 3600,
            })
        }

        async fn verify(
            &self,
            _session_id: ExclusiveSessionId,
            geo: Option<GeoSample>,
        ) -> ExclusiveResult<Verification> {
            self.calls.lock().unwrap().push("verify");
            self.geos.lock().unwrap().push(geo);
            if let Some(err) = self.verify_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(Verification {
                verification_code: "V-1234".into(),
            })
        }

        async fn complete(
            &self,
            _session_id: ExclusiveSessionId,
            feedback: Option<Feedback>,
        ) -> ExclusiveResult<String> {
            self.calls.lock().unwrap().push("complete");
            self.feedback.lock().unwrap().push(feedback);
            Ok("completed".into())
        }
    }

    pub type Machine = SessionMachine<FakeApi, Arc<FixedLocation>>;

    pub struct Harness {
        pub machine: Machine,
        pub api: Arc<FakeApi>,
        pub device: Arc<FixedLocation>,
        pub store: Arc<MemoryStore>,
        pub flags: Arc<AppSessionFlags>,
    }

    pub fn harness() -> Harness {
        harness_with(Arc::new(AppSessionFlags::new()))
    }

    /// A machine sharing `flags` with other machines of the same app session
    pub fn harness_with(flags: Arc<AppSessionFlags>) -> Harness {
        let api = Arc::new(FakeApi::default());
        let device = Arc::new(FixedLocation::new(DOWN_THE_BLOCK, Some(12.0)));
        let store = Arc::new(MemoryStore::new());
        let kv: Arc<dyn KeyValueStore> = store.clone();
        let machine = SessionMachine::new(
            api.clone(),
            device.clone(),
            kv,
            flags.clone(),
            ExclusiveConfig::default(),
        );
        Harness {
            machine,
            api,
            device,
            store,
            flags,
        }
    }

    pub fn taco_stand() -> ActivateInput {
        ActivateInput {
            merchant_id: "m_taco".into(),
            charger_id: "ch_7".into(),
            merchant_location: TACO_STAND,
        }
    }

    pub fn stored_reservation(store: &MemoryStore, session_id: &str) -> Option<String> {
        store.get(&format!("reservation_id_{session_id}")).unwrap()
    }

    /// Let spawned pollers run without crossing a countdown tick
    pub async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod happy_path_tests {
    use std::time::Duration;

    use super::fixtures::*;
    use crate::domain::entities::Feedback;
    use crate::domain::value_objects::FlowStage;

    #[tokio::test(start_paused = true)]
    async fn test_full_flow_with_preferences() {
        let mut h = harness();

        h.machine.activate(taco_stand()).await.unwrap();
        assert_eq!(h.machine.stage(), FlowStage::Activated);
        assert_eq!(h.machine.remaining_seconds(), Some(3600));

        let session_id = h.machine.session().unwrap().id.clone();
        assert_eq!(session_id.as_str(), "ex_1");
        let reservation = h.machine.reservation_id().unwrap().unwrap();
        assert_eq!(
            stored_reservation(&h.store, "ex_1").as_deref(),
            Some(reservation.as_str())
        );

        h.machine.start_walking().unwrap();
        settle().await;
        assert_eq!(h.machine.stage(), FlowStage::Walking);
        let signal = h.machine.proximity().unwrap();
        assert!(!signal.is_near);
        assert!(signal.distance_meters.unwrap() > 300.0);

        // walk up and wait for the next poll
        h.device.set(AT_THE_DOOR, Some(5.0));
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert!(h.machine.proximity().unwrap().is_near);

        h.machine.confirm_arrival().await.unwrap();
        assert_eq!(h.machine.stage(), FlowStage::AtMerchant);
        assert_eq!(h.machine.state().verification_code(), Some("V-1234"));
        assert!(h.machine.proximity().is_none());

        // same reservation for the whole session
        assert_eq!(h.machine.reservation_id().unwrap().unwrap(), reservation);

        let next = h.machine.dismiss_verification().unwrap();
        assert_eq!(next, FlowStage::Preferences);
        assert!(h.flags.preferences_shown());
        assert_eq!(h.machine.remaining_seconds(), None);

        h.machine.close_preferences().unwrap();
        assert_eq!(h.machine.stage(), FlowStage::Completed);

        let status = h
            .machine
            .complete(Some(Feedback {
                rating: Some(5),
                comment: Some("great tacos".into()),
            }))
            .await
            .unwrap();
        assert_eq!(status, "completed");
        assert_eq!(h.machine.stage(), FlowStage::Idle);
        assert!(h.machine.session().is_none());
        assert_eq!(h.machine.reservation_id().unwrap(), None);
        assert_eq!(stored_reservation(&h.store, "ex_1"), None);

        assert_eq!(h.api.calls(), vec!["activate", "verify", "complete"]);
        let feedback = h.api.feedback.lock().unwrap()[0].clone().unwrap();
        assert_eq!(feedback.rating, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_geo_sent_with_activate_and_verify() {
        let mut h = harness();
        h.device.set(AT_THE_DOOR, Some(5.0));

        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;
        h.machine.confirm_arrival().await.unwrap();

        let geos = h.api.geos.lock().unwrap().clone();
        assert_eq!(geos.len(), 2);
        for geo in geos {
            let geo = geo.unwrap();
            assert_eq!(geo.coordinate(), AT_THE_DOOR);
            assert_eq!(geo.accuracy_meters, Some(5.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_exclusive_skips_preferences() {
        let mut first = harness();
        first.device.set(AT_THE_DOOR, None);
        first.machine.activate(taco_stand()).await.unwrap();
        first.machine.start_walking().unwrap();
        settle().await;
        first.machine.confirm_arrival().await.unwrap();
        assert_eq!(
            first.machine.dismiss_verification().unwrap(),
            FlowStage::Preferences
        );

        // same app session, new flow
        let mut second = harness_with(first.flags.clone());
        second.device.set(AT_THE_DOOR, None);
        second.machine.activate(taco_stand()).await.unwrap();
        second.machine.start_walking().unwrap();
        settle().await;
        second.machine.confirm_arrival().await.unwrap();
        assert_eq!(
            second.machine.dismiss_verification().unwrap(),
            FlowStage::Completed
        );
        assert_eq!(second.machine.stage(), FlowStage::Completed);

        // completed without feedback
        second.machine.complete(None).await.unwrap();
        assert_eq!(second.machine.stage(), FlowStage::Idle);
        assert_eq!(second.api.feedback.lock().unwrap()[0], None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_purges_stale_reservations() {
        use platform::storage::KeyValueStore;

        let mut h = harness();
        h.store.set("reservation_id_ex_old", "OLD1-OLD2").unwrap();
        h.store.set("access_token", "keep-me").unwrap();

        h.machine.activate(taco_stand()).await.unwrap();

        assert_eq!(stored_reservation(&h.store, "ex_old"), None);
        assert!(stored_reservation(&h.store, "ex_1").is_some());
        assert_eq!(
            h.store.get("access_token").unwrap().as_deref(),
            Some("keep-me")
        );
    }
}

#[cfg(test)]
mod countdown_tests {
    use std::time::Duration;

    use super::fixtures::*;
    use crate::domain::value_objects::FlowStage;
    use crate::error::ExclusiveError;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_from_server_value() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(h.machine.remaining_seconds(), Some(3590));

        let mut updates = h.machine.countdown_updates().unwrap();
        updates.borrow_and_update();
        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow(), 3589);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_releases_reservation() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        assert!(stored_reservation(&h.store, "ex_1").is_some());

        tokio::time::sleep(Duration::from_millis(3_601_500)).await;

        assert_eq!(h.machine.remaining_seconds(), Some(0));
        assert_eq!(stored_reservation(&h.store, "ex_1"), None);
        assert_eq!(h.machine.reservation_id().unwrap(), None);

        // even standing at the door
        h.device.set(AT_THE_DOOR, None);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!h.machine.proximity().unwrap().is_near);
        let err = h.machine.confirm_arrival().await.unwrap_err();
        assert!(matches!(err, ExclusiveError::Expired));
        assert_eq!(h.machine.stage(), FlowStage::Walking);
        assert_eq!(h.machine.last_error().unwrap().code(), "EXPIRED");
        assert_eq!(h.api.calls(), vec!["activate"]);

        // the user can still leave
        h.machine.abandon();
        assert_eq!(h.machine.stage(), FlowStage::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_stops_proximity_polling() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;

        tokio::time::sleep(Duration::from_millis(3_601_500)).await;
        assert_eq!(h.machine.remaining_seconds(), Some(0));

        let mut updates = h.machine.proximity_updates().unwrap();
        updates.borrow_and_update();
        let last = h.machine.proximity().unwrap();

        h.device.set(AT_THE_DOOR, Some(5.0));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!matches!(updates.has_changed(), Ok(true)));
        assert_eq!(h.machine.proximity().unwrap(), last);
        assert_eq!(h.machine.stage(), FlowStage::Walking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_freezes_after_verification() {
        let mut h = harness();
        h.device.set(AT_THE_DOOR, None);
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;
        h.machine.confirm_arrival().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(h.machine.remaining_seconds(), Some(3598));

        h.machine.dismiss_verification().unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        let frozen = h.machine.countdown_updates().unwrap();
        assert_eq!(*frozen.borrow(), 3598);
    }
}

#[cfg(test)]
mod proximity_tests {
    use std::time::Duration;

    use platform::location::LocationError;

    use super::fixtures::*;
    use crate::domain::value_objects::FlowStage;
    use crate::error::ExclusiveError;

    #[tokio::test(start_paused = true)]
    async fn test_not_near_keeps_walking() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;

        let err = h.machine.confirm_arrival().await.unwrap_err();
        match err {
            ExclusiveError::NotNear {
                distance_meters,
                radius_meters,
            } => {
                assert!(distance_meters > 300.0);
                assert_eq!(radius_meters, 150.0);
            }
            other => panic!("expected NotNear, got {other:?}"),
        }
        assert_eq!(h.machine.stage(), FlowStage::Walking);
        assert_eq!(h.machine.last_error().unwrap().code(), "NOT_NEAR");
        assert!(!h.api.calls().contains(&"verify"));

        // retry after walking up clears the error
        h.device.set(AT_THE_DOOR, None);
        tokio::time::sleep(Duration::from_secs(5)).await;
        h.machine.confirm_arrival().await.unwrap();
        assert!(h.machine.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_position_blocks_arrival() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        h.device.fail(LocationError::PermissionDenied);
        h.machine.start_walking().unwrap();
        settle().await;

        assert!(h.machine.proximity().unwrap().is_unknown());
        let err = h.machine.confirm_arrival().await.unwrap_err();
        assert!(matches!(err, ExclusiveError::ProximityUnknown));
        assert_eq!(h.machine.stage(), FlowStage::Walking);
        assert_eq!(h.machine.last_error().unwrap().code(), "PROXIMITY_UNKNOWN");
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_location_still_activates() {
        let mut h = harness();
        h.device.fail(LocationError::PermissionDenied);

        h.machine.activate(taco_stand()).await.unwrap();
        assert_eq!(h.machine.stage(), FlowStage::Activated);
        assert_eq!(h.api.geos.lock().unwrap().clone(), vec![None]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_only_while_walking() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        assert!(h.machine.proximity().is_none());

        h.machine.start_walking().unwrap();
        let mut updates = h.machine.proximity_updates().unwrap();
        settle().await;
        assert!(h.machine.proximity().is_some());

        h.machine.abandon();
        assert!(h.machine.proximity().is_none());
        tokio::time::sleep(Duration::from_secs(30)).await;
        // the sender went away with the poller
        updates.borrow_and_update();
        assert!(updates.changed().await.is_err());
    }
}

#[cfg(test)]
mod failure_tests {
    use auth::ClientError;

    use super::fixtures::*;
    use crate::domain::entities::Feedback;
    use crate::domain::value_objects::{FlowAction, FlowStage};
    use crate::error::ExclusiveError;

    #[tokio::test(start_paused = true)]
    async fn test_failed_activate_stays_idle_and_retries() {
        let mut h = harness();
        h.api.fail_next_activate(ExclusiveError::Client(ClientError::Http {
            status: 503,
            message: "Service Unavailable".into(),
            code: None,
        }));

        let err = h.machine.activate(taco_stand()).await.unwrap_err();
        assert_eq!(err.code(), "SERVER_ERROR");
        assert_eq!(err.status(), 503);
        assert_eq!(h.machine.stage(), FlowStage::Idle);
        assert_eq!(h.machine.last_error().unwrap().status(), 503);
        assert!(h.machine.countdown_updates().is_none());

        h.machine.dismiss_error();
        assert!(h.machine.last_error().is_none());

        h.machine.activate(taco_stand()).await.unwrap();
        assert_eq!(h.machine.stage(), FlowStage::Activated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expiry_during_verify_tears_down() {
        let mut h = harness();
        h.device.set(AT_THE_DOOR, None);
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;
        assert!(stored_reservation(&h.store, "ex_1").is_some());

        h.api.fail_next_verify(ExclusiveError::Client(ClientError::RefreshFailed {
            message: "refresh token revoked".into(),
        }));

        let err = h.machine.confirm_arrival().await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(h.machine.stage(), FlowStage::Idle);
        assert_eq!(stored_reservation(&h.store, "ex_1"), None);
        assert!(h.machine.last_error().unwrap().is_session_expired());
        assert!(h.machine.countdown_updates().is_none());
        assert!(h.machine.proximity().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ordinary_verify_failure_keeps_walking() {
        let mut h = harness();
        h.device.set(AT_THE_DOOR, None);
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;

        h.api.fail_next_verify(ExclusiveError::Client(ClientError::Network {
            message: "connection reset".into(),
        }));
        let err = h.machine.confirm_arrival().await.unwrap_err();
        assert_eq!(err.code(), "NETWORK_ERROR");
        assert_eq!(h.machine.stage(), FlowStage::Walking);
        assert!(h.machine.proximity().is_some());

        h.machine.confirm_arrival().await.unwrap();
        assert_eq!(h.machine.stage(), FlowStage::AtMerchant);
    }

    #[tokio::test(start_paused = true)]
    async fn test_illegal_transitions_leave_state_alone() {
        let mut h = harness();

        let err = h.machine.start_walking().unwrap_err();
        assert!(matches!(
            err,
            ExclusiveError::IllegalTransition {
                from: FlowStage::Idle,
                action: FlowAction::StartWalking
            }
        ));
        assert!(h.machine.confirm_arrival().await.is_err());
        assert!(h.machine.dismiss_verification().is_err());
        assert!(h.machine.complete(None).await.is_err());
        assert!(!h.machine.can(FlowAction::Continue));
        assert!(h.machine.can(FlowAction::Activate));

        h.machine.activate(taco_stand()).await.unwrap();
        let err = h.machine.activate(taco_stand()).await.unwrap_err();
        assert_eq!(err.code(), "ILLEGAL_TRANSITION");
        assert!(h.machine.close_preferences().is_err());
        assert_eq!(h.machine.stage(), FlowStage::Activated);
        assert_eq!(h.api.calls(), vec!["activate"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_feedback_rejected_locally() {
        let mut h = harness();
        h.device.set(AT_THE_DOOR, None);
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();
        settle().await;
        h.machine.confirm_arrival().await.unwrap();
        h.machine.dismiss_verification().unwrap();
        h.machine.close_preferences().unwrap();

        let err = h
            .machine
            .complete(Some(Feedback {
                rating: Some(9),
                comment: None,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ExclusiveError::InvalidFeedback(_)));
        assert_eq!(h.machine.stage(), FlowStage::Completed);
        assert!(!h.api.calls().contains(&"complete"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_and_session_expired_return_to_idle() {
        let mut h = harness();
        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.start_walking().unwrap();

        h.machine.abandon();
        assert_eq!(h.machine.stage(), FlowStage::Idle);
        assert_eq!(stored_reservation(&h.store, "ex_1"), None);
        assert_eq!(h.machine.remaining_seconds(), None);

        // idle abandon is a no-op
        h.machine.abandon();

        h.machine.activate(taco_stand()).await.unwrap();
        h.machine.on_session_expired();
        assert_eq!(h.machine.stage(), FlowStage::Idle);
        assert_eq!(stored_reservation(&h.store, "ex_2"), None);
    }
}
