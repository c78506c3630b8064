//! Geocoordinates
//!
//! Coordinates, device samples, quantized cache keys and haversine distance.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 4 decimal places is roughly 11 m of latitude
pub const DEFAULT_KEY_PRECISION: u8 = 4;

/// WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_meters(self, other)
    }
}

/// One reading from the device location source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: Option<f64>,
    pub sampled_at: DateTime<Utc>,
}

impl GeoSample {
    pub fn new(coordinate: Coordinate, accuracy_meters: Option<f64>) -> Self {
        Self {
            lat: coordinate.lat,
            lng: coordinate.lng,
            accuracy_meters,
            sampled_at: Utc::now(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Coordinate rounded to a fixed number of decimals
///
/// Stored as scaled integers so equal keys compare and hash exactly.
/// Rounding is half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat_scaled: i64,
    lng_scaled: i64,
    precision: u8,
}

impl CoordKey {
    pub fn quantize(coordinate: &Coordinate, precision: u8) -> Self {
        let scale = 10f64.powi(i32::from(precision));
        Self {
            lat_scaled: (coordinate.lat * scale).round() as i64,
            lng_scaled: (coordinate.lng * scale).round() as i64,
            precision,
        }
    }

    /// The rounded coordinate this key stands for
    pub fn coordinate(&self) -> Coordinate {
        let scale = 10f64.powi(i32::from(self.precision));
        Coordinate::new(
            self.lat_scaled as f64 / scale,
            self.lng_scaled as f64 / scale,
        )
    }
}

impl From<&Coordinate> for CoordKey {
    fn from(coordinate: &Coordinate) -> Self {
        Self::quantize(coordinate, DEFAULT_KEY_PRECISION)
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.coordinate();
        let p = usize::from(self.precision);
        write!(f, "{:.p$},{:.p$}", c.lat, c.lng)
    }
}

/// Haversine distance between two coordinates, in meters
pub fn haversine_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}
