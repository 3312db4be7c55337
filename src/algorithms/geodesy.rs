//! Geodetic transforms between LLA, ECEF and local ENU frames
//!
//! All conversions are closed form on the ellipsoid passed by the caller:
//! - geodetic (lat/lon/alt) to ECEF and back (Bowring)
//! - ECEF to a local tangent plane at an explicit origin and back
//! - the ENU-to-ECEF rotation used to project velocity vectors

use crate::core::{Ecef, Ellipsoid, Enu, EnuToEcef, Geodetic};

impl Ellipsoid {
    /// Convert a geodetic position to ECEF coordinates
    pub fn geodetic_to_ecef(&self, position: &Geodetic) -> Ecef {
        self.lla_to_ecef(position.lat, position.lon, position.alt)
    }

    /// Convert latitude/longitude (degrees) and altitude (meters) to ECEF
    pub fn lla_to_ecef(&self, lat: f64, lon: f64, alt: f64) -> Ecef {
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let e2 = self.eccentricity_squared();

        // Prime vertical radius of curvature
        let n = self.semi_major_axis / (1.0 - e2 * sin_lat * sin_lat).sqrt();

        Ecef::new(
            (n + alt) * cos_lat * cos_lon,
            (n + alt) * cos_lat * sin_lon,
            (n * (1.0 - e2) + alt) * sin_lat,
        )
    }

    /// Convert ECEF coordinates back to geodetic latitude/longitude/altitude
    pub fn ecef_to_geodetic(&self, position: &Ecef) -> Geodetic {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis;
        let e2 = self.eccentricity_squared();
        let ep2 = self.second_eccentricity_squared();
        let (x, y, z) = (position.0.x, position.0.y, position.0.z);

        let lon = y.atan2(x);
        let p = x.hypot(y);

        let theta = (z * a).atan2(p * b);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let lat = (z + ep2 * b * sin_theta.powi(3)).atan2(p - e2 * a * cos_theta.powi(3));

        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        // Stays well conditioned at the poles, unlike p / cos(lat) - N
        let alt = p * cos_lat + z * sin_lat - a * a / n;

        Geodetic {
            lat: lat.to_degrees(),
            lon: lon.to_degrees(),
            alt,
        }
    }

    /// Express an ECEF point in the tangent plane centred at `origin`
    pub fn ecef_to_enu(&self, position: &Ecef, origin: &Geodetic) -> Enu {
        LocalFrame::new(*self, *origin).ecef_to_local(position)
    }

    /// Inverse of [`Ellipsoid::ecef_to_enu`]
    pub fn enu_to_ecef(&self, position: &Enu, origin: &Geodetic) -> Ecef {
        LocalFrame::new(*self, *origin).local_to_ecef(position)
    }
}

/// Rotation mapping ENU vectors at `lat`, `lon` into ECEF.
///
/// Velocity must be rotated with the matrix evaluated at the target's own
/// location; the rotation changes with position.
pub fn enu_to_ecef_rotation(lat: f64, lon: f64) -> EnuToEcef {
    EnuToEcef::at(lat, lon)
}

/// Wrap a longitude into [-180, 180)
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Mean longitude that stays correct when the inputs straddle the antimeridian
pub fn mean_longitude(longitudes: &[f64]) -> f64 {
    let Some(&reference) = longitudes.first() else {
        return 0.0;
    };
    let mean_offset = longitudes
        .iter()
        .map(|lon| normalize_longitude(lon - reference))
        .sum::<f64>()
        / longitudes.len() as f64;
    normalize_longitude(reference + mean_offset)
}

/// Local tangent plane anchored at an explicit geodetic origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    ellipsoid: Ellipsoid,
    origin: Geodetic,
    origin_ecef: Ecef,
    rotation: EnuToEcef,
}

impl LocalFrame {
    pub fn new(ellipsoid: Ellipsoid, origin: Geodetic) -> Self {
        Self {
            ellipsoid,
            origin,
            origin_ecef: ellipsoid.geodetic_to_ecef(&origin),
            rotation: EnuToEcef::at(origin.lat, origin.lon),
        }
    }

    pub fn origin(&self) -> &Geodetic {
        &self.origin
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn ecef_to_local(&self, position: &Ecef) -> Enu {
        self.rotation.transpose_apply(&(*position - self.origin_ecef))
    }

    pub fn local_to_ecef(&self, position: &Enu) -> Ecef {
        self.origin_ecef + self.rotation.apply(position)
    }

    pub fn geodetic_to_local(&self, position: &Geodetic) -> Enu {
        self.ecef_to_local(&self.ellipsoid.geodetic_to_ecef(position))
    }

    pub fn local_to_geodetic(&self, position: &Enu) -> Geodetic {
        self.ellipsoid.ecef_to_geodetic(&self.local_to_ecef(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_lla_to_ecef_reference_points() {
        let wgs84 = Ellipsoid::wgs84();

        let equator = wgs84.lla_to_ecef(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(equator.0.x, wgs84.semi_major_axis, epsilon = 1e-6);
        assert_abs_diff_eq!(equator.0.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(equator.0.z, 0.0, epsilon = 1e-6);

        let pole = wgs84.lla_to_ecef(90.0, 0.0, 0.0);
        assert_abs_diff_eq!(pole.0.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pole.0.z, wgs84.semi_minor_axis, epsilon = 1e-6);

        let east = wgs84.lla_to_ecef(0.0, 90.0, 1000.0);
        assert_abs_diff_eq!(east.0.y, wgs84.semi_major_axis + 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ecef_to_geodetic_at_pole() {
        let wgs84 = Ellipsoid::wgs84();
        let back = wgs84.ecef_to_geodetic(&wgs84.lla_to_ecef(-90.0, 0.0, 250.0));
        assert_abs_diff_eq!(back.lat, -90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back.alt, 250.0, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn test_geodetic_round_trip(
            lat in -89.9f64..89.9,
            lon in -180.0f64..180.0,
            alt in -500.0f64..100_000.0,
        ) {
            let wgs84 = Ellipsoid::wgs84();
            let back = wgs84.ecef_to_geodetic(&wgs84.lla_to_ecef(lat, lon, alt));
            prop_assert!((back.lat - lat).abs() < 1e-6);
            prop_assert!(normalize_longitude(back.lon - lon).abs() < 1e-6);
            prop_assert!((back.alt - alt).abs() < 0.01);
        }
    }

    #[test]
    fn test_enu_of_origin_and_zenith() {
        let wgs84 = Ellipsoid::wgs84();
        let origin = Geodetic::new(51.4779, -0.0015, 0.0);

        let at_origin = wgs84.ecef_to_enu(&wgs84.geodetic_to_ecef(&origin), &origin);
        assert_abs_diff_eq!(at_origin.norm(), 0.0, epsilon = 1e-6);

        let above = Geodetic::new(origin.lat, origin.lon, 1500.0);
        let enu = wgs84.ecef_to_enu(&wgs84.geodetic_to_ecef(&above), &origin);
        assert_abs_diff_eq!(enu.east(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(enu.north(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(enu.up(), 1500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ellipsoid_enu_round_trip() {
        let wgs84 = Ellipsoid::wgs84();
        let origin = Geodetic::new(64.13, -21.94, 40.0);
        let target = wgs84.lla_to_ecef(64.30, -21.50, 11_000.0);

        let enu = wgs84.ecef_to_enu(&target, &origin);
        let back = wgs84.enu_to_ecef(&enu, &origin);
        assert_abs_diff_eq!(back.0, target.0, epsilon = 1e-6);
        assert_abs_diff_eq!(enu.norm(), target.distance_to(&wgs84.geodetic_to_ecef(&origin)), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_matches_frame_axes() {
        let frame = LocalFrame::new(Ellipsoid::wgs84(), Geodetic::surface(-12.5, 130.8));
        let rotation = enu_to_ecef_rotation(-12.5, 130.8);
        let step = Enu::new(30.0, -40.0, 120.0);

        let moved = frame.local_to_ecef(&step) - frame.local_to_ecef(&Enu::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(moved.0, rotation.apply(&step).0, epsilon = 1e-6);
    }

    #[test]
    fn test_enu_axes_orientation() {
        let frame = LocalFrame::new(Ellipsoid::wgs84(), Geodetic::surface(10.0, 20.0));

        let north = frame.geodetic_to_local(&Geodetic::surface(10.01, 20.0));
        assert!(north.north() > 1000.0);
        assert!(north.east().abs() < 1e-3);

        let east = frame.geodetic_to_local(&Geodetic::surface(10.0, 20.01));
        assert!(east.east() > 1000.0);
        // Earth curvature drops distant surface points below the plane
        assert!(east.up() < 0.0);
    }

    #[test]
    fn test_local_frame_round_trip() {
        let frame = LocalFrame::new(Ellipsoid::wgs84(), Geodetic::surface(-33.86, 151.21));
        let target = Geodetic::new(-33.70, 151.40, 9500.0);

        let local = frame.geodetic_to_local(&target);
        let back = frame.local_to_geodetic(&local);

        assert_abs_diff_eq!(back.lat, target.lat, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lon, target.lon, epsilon = 1e-9);
        assert_abs_diff_eq!(back.alt, target.alt, epsilon = 1e-4);
        assert_abs_diff_eq!(frame.ecef_to_local(&frame.local_to_ecef(&local)).0, local.0, epsilon = 1e-6);
    }

    #[test]
    fn test_local_frame_across_antimeridian() {
        let frame = LocalFrame::new(Ellipsoid::wgs84(), Geodetic::surface(0.0, 179.9999));
        let other_side = frame.geodetic_to_local(&Geodetic::surface(0.0, -179.9999));
        // 0.0002 degrees of longitude at the equator
        assert_abs_diff_eq!(other_side.east(), 22.26, epsilon = 0.05);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_abs_diff_eq!(normalize_longitude(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(45.0), 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(359.9998), -0.0002, epsilon = 1e-9);
    }

    #[test]
    fn test_mean_longitude() {
        assert_abs_diff_eq!(mean_longitude(&[10.0, 20.0, 30.0]), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean_longitude(&[179.9, -179.9, 179.95]), 179.983333333, epsilon = 1e-6);
        assert_eq!(mean_longitude(&[]), 0.0);
    }
}
