//! Repository Traits
//!
//! Interface to the exclusive endpoints. Implementation is in infrastructure layer.

use kernel::id::ExclusiveSessionId;
use platform::geo::GeoSample;

use crate::domain::entities::{ActivatedExclusive, ActivationRequest, Feedback, Verification};
use crate::error::ExclusiveResult;

/// Exclusive API trait
#[trait_variant::make(ExclusiveApi: Send)]
pub trait LocalExclusiveApi {
    /// Activate an exclusive at a merchant
    async fn activate(&self, request: ActivationRequest) -> ExclusiveResult<ActivatedExclusive>;

    /// Verify arrival at the merchant
    async fn verify(
        &self,
        session_id: ExclusiveSessionId,
        geo: Option<GeoSample>,
    ) -> ExclusiveResult<Verification>;

    /// Complete the exclusive; returns the server status
    async fn complete(
        &self,
        session_id: ExclusiveSessionId,
        feedback: Option<Feedback>,
    ) -> ExclusiveResult<String>;
}
