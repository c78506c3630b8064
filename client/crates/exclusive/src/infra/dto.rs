//! Wire DTOs for the exclusive endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Feedback;

/// Body of `POST /v1/exclusive/activate`; `lat`/`lng` are sent as `null`
/// when the position is unknown
#[derive(Debug, Serialize)]
pub struct ActivateRequest<'a> {
    pub merchant_id: &'a str,
    pub charger_id: &'a str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateResponse {
    pub exclusive_session: ExclusiveSessionDto,
}

#[derive(Debug, Deserialize)]
pub struct ExclusiveSessionDto {
    pub id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Signed so a skewed server value clamps to zero instead of failing
    pub remaining_seconds: i64,
}

impl ExclusiveSessionDto {
    pub fn remaining_seconds(&self) -> u32 {
        u32::try_from(self.remaining_seconds.max(0)).unwrap_or(u32::MAX)
    }
}

/// Body of `POST /v1/exclusive/verify`
#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub exclusive_session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    pub verification_code: String,
}

/// Body of `POST /v1/exclusive/complete`
#[derive(Debug, Serialize)]
pub struct CompleteRequest<'a> {
    pub exclusive_session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<&'a Feedback>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteResponse {
    #[serde(default)]
    pub status: String,
}
