//! Wire DTOs

use serde::Serialize;

/// Body of `POST /v1/intent/capture`
#[derive(Debug, Clone, Serialize)]
pub struct IntentCaptureRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}
