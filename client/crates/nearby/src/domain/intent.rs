//! Intent Capture Result
//!
//! What the API returns for "what's nearby": merchants around the device
//! and a summary of the charger the user is at. Decoding is lenient; unknown
//! fields are ignored and missing optional fields default.

use kernel::id::{ChargerId, MerchantId};
use platform::geo::Coordinate;
use serde::{Deserialize, Serialize};

/// A merchant near the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyMerchant {
    pub id: MerchantId,
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    /// Whether an exclusive can be activated here
    #[serde(default)]
    pub exclusive_available: bool,
}

impl NearbyMerchant {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lng?))
    }
}

/// Charger the user is plugged into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSummary {
    #[serde(default)]
    pub id: Option<ChargerId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub available_stalls: Option<u32>,
}

/// Response of `POST /v1/intent/capture`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentCapture {
    #[serde(default)]
    pub merchants: Vec<NearbyMerchant>,
    #[serde(default)]
    pub charger_summary: Option<ChargerSummary>,
}

impl IntentCapture {
    pub fn exclusive_merchants(&self) -> impl Iterator<Item = &NearbyMerchant> {
        self.merchants.iter().filter(|m| m.exclusive_available)
    }
}
