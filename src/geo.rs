//! Position fixes and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single position reading from the locator.
///
/// Fixes are produced once per update cycle and superseded by the next one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    /// Horizontal accuracy in meters (>= 0).
    pub accuracy: f64,
    pub valid: bool,
}

impl PositionFix {
    /// A valid fix at the given coordinates with zero altitude and accuracy.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            accuracy: 0.0,
            valid: true,
        }
    }

    /// A fix reporting loss of signal.
    pub fn invalid() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            accuracy: 0.0,
            valid: false,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy.max(0.0);
        self
    }

    /// Great-circle distance to another fix, ignoring validity.
    pub fn distance_to(&self, other: &PositionFix) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl Default for PositionFix {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Haversine distance in meters between two latitude/longitude pairs in degrees.
///
/// The intermediate `a` term is clamped to `[0, 1]` so rounding near antipodal
/// or coincident points never leaves the domain of `asin`/`sqrt`.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}
