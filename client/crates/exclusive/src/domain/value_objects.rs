//! Domain Value Objects

use std::fmt;

use platform::random::{READABLE_ALPHABET, random_code};
use serde::{Deserialize, Serialize};

// ============================================================================
// Flow Stage
// ============================================================================

/// Where the user is in the activation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    Idle,
    Activated,
    Walking,
    AtMerchant,
    Preferences,
    Completed,
}

impl FlowStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FlowStage::Idle => "idle",
            FlowStage::Activated => "activated",
            FlowStage::Walking => "walking",
            FlowStage::AtMerchant => "at_merchant",
            FlowStage::Preferences => "preferences",
            FlowStage::Completed => "completed",
        }
    }

    /// Stages that carry the countdown
    pub const fn has_countdown(&self) -> bool {
        matches!(
            self,
            FlowStage::Activated | FlowStage::Walking | FlowStage::AtMerchant
        )
    }

    /// Stages that poll proximity
    pub const fn polls_proximity(&self) -> bool {
        matches!(self, FlowStage::Walking)
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Flow Action
// ============================================================================

/// User intent that moves the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowAction {
    Activate,
    StartWalking,
    ConfirmArrival,
    DismissVerification,
    ClosePreferences,
    Continue,
}

impl FlowAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FlowAction::Activate => "activate",
            FlowAction::StartWalking => "start_walking",
            FlowAction::ConfirmArrival => "confirm_arrival",
            FlowAction::DismissVerification => "dismiss_verification",
            FlowAction::ClosePreferences => "close_preferences",
            FlowAction::Continue => "continue",
        }
    }
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reservation Id
// ============================================================================

/// Client-side token shown at the merchant, e.g. `K7QM-3XHD`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationId(String);

impl ReservationId {
    const GROUP_LEN: usize = 4;

    pub fn generate() -> Self {
        let a = random_code(READABLE_ALPHABET, Self::GROUP_LEN);
        let b = random_code(READABLE_ALPHABET, Self::GROUP_LEN);
        Self(format!("{a}-{b}"))
    }

    /// Restore a stored id
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Proximity Signal
// ============================================================================

/// One proximity reading
///
/// `distance_meters == None` means the position is unknown (permission
/// denied or timed out), which is not the same as far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximitySignal {
    pub distance_meters: Option<f64>,
    pub is_near: bool,
}

impl ProximitySignal {
    pub const fn unknown() -> Self {
        Self {
            distance_meters: None,
            is_near: false,
        }
    }

    pub fn measured(distance_meters: f64, radius_meters: f64) -> Self {
        Self {
            distance_meters: Some(distance_meters),
            is_near: distance_meters <= radius_meters,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.distance_meters.is_none()
    }
}
