//! Physical constants and earth model parameters

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6378137.0;

/// WGS84 semi-minor axis (meters)
pub const WGS84_SEMI_MINOR_AXIS_M: f64 = 6356752.314245;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Carrier frequencies arrive in MHz
pub const HZ_PER_MHZ: f64 = 1e6;

/// Bistatic ranges arrive in km
pub const METERS_PER_KM: f64 = 1000.0;

/// Flat-earth approximation used by the accuracy metrics
pub const METERS_PER_DEGREE: f64 = 111_111.0;

/// Reference ellipsoid for geodetic conversions.
///
/// Passed explicitly to every transform so alternate ellipsoids can be
/// substituted in tests; the crate never reaches for a global earth model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub semi_major_axis: f64,
    /// Semi-minor axis (meters)
    pub semi_minor_axis: f64,
}

impl Ellipsoid {
    pub const fn wgs84() -> Self {
        Self {
            semi_major_axis: WGS84_SEMI_MAJOR_AXIS_M,
            semi_minor_axis: WGS84_SEMI_MINOR_AXIS_M,
        }
    }

    /// First eccentricity squared, 1 - (b/a)^2
    pub fn eccentricity_squared(&self) -> f64 {
        let ratio = self.semi_minor_axis / self.semi_major_axis;
        1.0 - ratio * ratio
    }

    /// Second eccentricity squared, (a^2 - b^2) / b^2
    pub fn second_eccentricity_squared(&self) -> f64 {
        let a2 = self.semi_major_axis * self.semi_major_axis;
        let b2 = self.semi_minor_axis * self.semi_minor_axis;
        (a2 - b2) / b2
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// Immutable physics shared by the geodetic transforms and the measurement model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    pub ellipsoid: Ellipsoid,
    /// Propagation speed (m/s)
    pub speed_of_light_m_s: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::wgs84(),
            speed_of_light_m_s: SPEED_OF_LIGHT_M_S,
        }
    }
}
