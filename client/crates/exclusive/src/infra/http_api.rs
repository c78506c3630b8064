//! HTTP Exclusive API
//!
//! [`ExclusiveApi`] over the authenticated request client.

use auth::RequestClient;
use kernel::id::ExclusiveSessionId;
use platform::geo::GeoSample;

use crate::domain::entities::{ActivatedExclusive, ActivationRequest, Feedback, Verification};
use crate::domain::repository::ExclusiveApi;
use crate::error::ExclusiveResult;
use crate::infra::dto::{
    ActivateRequest, ActivateResponse, CompleteRequest, CompleteResponse, VerifyRequest,
    VerifyResponse,
};

pub const ACTIVATE_PATH: &str = "/v1/exclusive/activate";
pub const VERIFY_PATH: &str = "/v1/exclusive/verify";
pub const COMPLETE_PATH: &str = "/v1/exclusive/complete";

/// HTTP implementation of [`ExclusiveApi`]
#[derive(Clone)]
pub struct HttpExclusiveApi {
    client: RequestClient,
}

impl HttpExclusiveApi {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }
}

impl ExclusiveApi for HttpExclusiveApi {
    async fn activate(&self, request: ActivationRequest) -> ExclusiveResult<ActivatedExclusive> {
        let body = ActivateRequest {
            merchant_id: request.merchant_id.as_str(),
            charger_id: request.charger_id.as_str(),
            lat: request.geo.as_ref().map(|g| g.lat),
            lng: request.geo.as_ref().map(|g| g.lng),
            accuracy_m: request.geo.as_ref().and_then(|g| g.accuracy_meters),
        };

        let response: ActivateResponse = self.client.post_json(ACTIVATE_PATH, &body).await?;
        let remaining_seconds = response.exclusive_session.remaining_seconds();
        let session = response.exclusive_session;

        Ok(ActivatedExclusive {
            id: ExclusiveSessionId::new(session.id),
            expires_at: session.expires_at,
            remaining_seconds,
        })
    }

    async fn verify(
        &self,
        session_id: ExclusiveSessionId,
        geo: Option<GeoSample>,
    ) -> ExclusiveResult<Verification> {
        let body = VerifyRequest {
            exclusive_session_id: session_id.as_str(),
            lat: geo.as_ref().map(|g| g.lat),
            lng: geo.as_ref().map(|g| g.lng),
        };

        let response: VerifyResponse = self.client.post_json(VERIFY_PATH, &body).await?;
        Ok(Verification {
            verification_code: response.verification_code,
        })
    }

    async fn complete(
        &self,
        session_id: ExclusiveSessionId,
        feedback: Option<Feedback>,
    ) -> ExclusiveResult<String> {
        let body = CompleteRequest {
            exclusive_session_id: session_id.as_str(),
            feedback: feedback.as_ref(),
        };

        let response: CompleteResponse = self.client.post_json(COMPLETE_PATH, &body).await?;
        Ok(response.status)
    }
}
