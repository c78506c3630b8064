//! Intent Capture Use Case
//!
//! "What's nearby" for the device position, served through the geo cache.

use auth::RequestClient;
use platform::geo::Coordinate;

use crate::application::geo_cache::GeoCache;
use crate::domain::intent::IntentCapture;
use crate::error::{NearbyError, NearbyResult};
use crate::infra::dto::IntentCaptureRequest;

pub const INTENT_CAPTURE_PATH: &str = "/v1/intent/capture";

/// Intent capture input
#[derive(Debug, Clone, Copy)]
pub struct IntentCaptureInput {
    pub coordinate: Coordinate,
    pub accuracy_m: Option<f64>,
}

/// Intent capture use case
#[derive(Clone)]
pub struct IntentCaptureUseCase {
    client: RequestClient,
    cache: GeoCache<IntentCapture>,
}

impl IntentCaptureUseCase {
    pub fn new(client: RequestClient, cache: GeoCache<IntentCapture>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &GeoCache<IntentCapture> {
        &self.cache
    }

    pub async fn execute(&self, input: IntentCaptureInput) -> NearbyResult<IntentCapture> {
        let Coordinate { lat, lng } = input.coordinate;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(NearbyError::InvalidCoordinate { lat, lng });
        }

        let client = self.client.clone();
        let body = IntentCaptureRequest {
            lat,
            lng,
            accuracy_m: input.accuracy_m,
        };

        self.cache
            .get(input.coordinate, move || async move {
                client.post_json(INTENT_CAPTURE_PATH, &body).await
            })
            .await
    }
}
