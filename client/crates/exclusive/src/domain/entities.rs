//! Domain Entities

use chrono::{DateTime, Utc};
use kernel::id::{ChargerId, ExclusiveSessionId, MerchantId};
use platform::geo::{Coordinate, GeoSample};
use serde::Serialize;

use crate::domain::value_objects::FlowStage;

// ============================================================================
// Exclusive Session
// ============================================================================

/// A server-confirmed, time-boxed activation at a merchant
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusiveSession {
    pub id: ExclusiveSessionId,
    pub merchant_id: MerchantId,
    pub charger_id: ChargerId,
    /// Where the user has to walk to
    pub merchant_location: Coordinate,
    pub activated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Seconds left as reported by the server at activation
    pub remaining_seconds: u32,
}

// ============================================================================
// Flow State
// ============================================================================

/// The activation flow; exactly one stage at a time
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Activated {
        session: ExclusiveSession,
    },
    Walking {
        session: ExclusiveSession,
    },
    AtMerchant {
        session: ExclusiveSession,
        verification_code: String,
    },
    Preferences {
        session: ExclusiveSession,
        verification_code: String,
    },
    Completed {
        session: ExclusiveSession,
    },
}

impl FlowState {
    pub fn stage(&self) -> FlowStage {
        match self {
            FlowState::Idle => FlowStage::Idle,
            FlowState::Activated { .. } => FlowStage::Activated,
            FlowState::Walking { .. } => FlowStage::Walking,
            FlowState::AtMerchant { .. } => FlowStage::AtMerchant,
            FlowState::Preferences { .. } => FlowStage::Preferences,
            FlowState::Completed { .. } => FlowStage::Completed,
        }
    }

    pub fn session(&self) -> Option<&ExclusiveSession> {
        match self {
            FlowState::Idle => None,
            FlowState::Activated { session }
            | FlowState::Walking { session }
            | FlowState::AtMerchant { session, .. }
            | FlowState::Preferences { session, .. }
            | FlowState::Completed { session } => Some(session),
        }
    }

    pub fn verification_code(&self) -> Option<&str> {
        match self {
            FlowState::AtMerchant {
                verification_code, ..
            }
            | FlowState::Preferences {
                verification_code, ..
            } => Some(verification_code),
            _ => None,
        }
    }

    /// This state moved to `stage`, keeping session data.
    ///
    /// Only valid for moves that need no new data (walking, preferences,
    /// completed); returns `None` otherwise.
    pub(crate) fn advance(&self, stage: FlowStage) -> Option<FlowState> {
        let session = self.session()?.clone();
        match stage {
            FlowStage::Walking => Some(FlowState::Walking { session }),
            FlowStage::Preferences => Some(FlowState::Preferences {
                session,
                verification_code: self.verification_code()?.to_owned(),
            }),
            FlowStage::Completed => Some(FlowState::Completed { session }),
            _ => None,
        }
    }
}

// ============================================================================
// API Payloads
// ============================================================================

/// Activation request
#[derive(Debug, Clone)]
pub struct ActivationRequest {
    pub merchant_id: MerchantId,
    pub charger_id: ChargerId,
    /// Best-effort device position
    pub geo: Option<GeoSample>,
}

/// Server-confirmed activation
#[derive(Debug, Clone, PartialEq)]
pub struct ActivatedExclusive {
    pub id: ExclusiveSessionId,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_seconds: u32,
}

/// Verification at the merchant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub verification_code: String,
}

/// Optional feedback sent with completion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Feedback {
    /// 1 to 5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Feedback {
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            rating: None,
            comment: Some(comment.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rating.is_none_or(|r| (1..=5).contains(&r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ExclusiveSession {
        ExclusiveSession {
            id: "ex_1".into(),
            merchant_id: "m_1".into(),
            charger_id: "ch_1".into(),
            merchant_location: Coordinate::new(30.2672, -97.7431),
            activated_at: Utc::now(),
            expires_at: None,
            remaining_seconds: 3600,
        }
    }

    #[test]
    fn test_advance_keeps_session_and_code() {
        let state = FlowState::AtMerchant {
            session: session(),
            verification_code: "V-1234".into(),
        };
        let next = state.advance(FlowStage::Preferences).unwrap();
        assert_eq!(next.stage(), FlowStage::Preferences);
        assert_eq!(next.verification_code(), Some("V-1234"));
        assert_eq!(next.session().unwrap().id.as_str(), "ex_1");
    }

    #[test]
    fn test_advance_rejects_stages_needing_data() {
        let state = FlowState::Activated { session: session() };
        assert!(state.advance(FlowStage::AtMerchant).is_none());
        assert!(state.advance(FlowStage::Preferences).is_none());
        assert!(FlowState::Idle.advance(FlowStage::Walking).is_none());
    }

    #[test]
    fn test_feedback_validation() {
        assert!(Feedback::default().is_valid());
        assert!(Feedback::comment("great tacos").is_valid());
        let bad = Feedback {
            rating: Some(6),
            comment: None,
        };
        assert!(!bad.is_valid());
    }
}
