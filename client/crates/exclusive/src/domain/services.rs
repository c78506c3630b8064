//! Domain Services
//!
//! The flow transition table.

use crate::domain::value_objects::{FlowAction, FlowStage};

/// Next stage for `action` taken in `from`, or `None` if the action is not
/// allowed there.
///
/// `show_preferences` decides where dismissing the verification screen
/// leads.
pub fn transition(
    from: FlowStage,
    action: FlowAction,
    show_preferences: bool,
) -> Option<FlowStage> {
    use FlowAction as A;
    use FlowStage as S;

    match (from, action) {
        (S::Idle, A::Activate) => Some(S::Activated),
        (S::Activated, A::StartWalking) => Some(S::Walking),
        (S::Walking, A::ConfirmArrival) => Some(S::AtMerchant),
        (S::AtMerchant, A::DismissVerification) if show_preferences => Some(S::Preferences),
        (S::AtMerchant, A::DismissVerification) => Some(S::Completed),
        (S::Preferences, A::ClosePreferences) => Some(S::Completed),
        (S::Completed, A::Continue) => Some(S::Idle),
        _ => None,
    }
}
