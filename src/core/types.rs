//! Core data types for the geolocation solver
//!
//! Cartesian quantities carry their frame in the type. `Ecef` and `Enu` only
//! combine with themselves, and the single bridge between them is
//! [`EnuToEcef`], so a velocity in local axes cannot be dotted against an
//! earth-centered line of sight without an explicit rotation.

use nalgebra::{Matrix3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Geodetic position on the reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geodetic {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Height above the ellipsoid in meters
    pub alt: f64,
}

impl Geodetic {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Point on the ellipsoid surface
    pub fn surface(lat: f64, lon: f64) -> Self {
        Self { lat, lon, alt: 0.0 }
    }
}

macro_rules! frame_vector {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name(pub Vector3<f64>);

        impl $name {
            pub fn new(x: f64, y: f64, z: f64) -> Self {
                Self(Vector3::new(x, y, z))
            }

            pub fn zeros() -> Self {
                Self(Vector3::zeros())
            }

            pub fn as_vector(&self) -> &Vector3<f64> {
                &self.0
            }

            pub fn norm(&self) -> f64 {
                self.0.norm()
            }

            pub fn dot(&self, other: &Self) -> f64 {
                self.0.dot(&other.0)
            }

            pub fn distance_to(&self, other: &Self) -> f64 {
                (other.0 - self.0).norm()
            }

            /// Unit vector from `self` towards `other`; zero when the points coincide
            pub fn direction_to(&self, other: &Self) -> Self {
                let diff = other.0 - self.0;
                let length = diff.norm();
                if length > 1e-10 {
                    Self(diff / length)
                } else {
                    Self::zeros()
                }
            }

            pub fn is_finite(&self) -> bool {
                self.0.iter().all(|c| c.is_finite())
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }
    };
}

frame_vector!(
    /// Earth-centered, earth-fixed vector (meters or m/s)
    Ecef
);

frame_vector!(
    /// East-north-up vector in a local tangent plane (meters or m/s)
    Enu
);

impl Enu {
    pub fn east(&self) -> f64 {
        self.0.x
    }

    pub fn north(&self) -> f64 {
        self.0.y
    }

    pub fn up(&self) -> f64 {
        self.0.z
    }
}

/// Rotation taking local east-north-up axes at a geodetic point into ECEF axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuToEcef(Matrix3<f64>);

impl EnuToEcef {
    /// Rotation for the tangent plane at `lat`, `lon` (degrees)
    pub fn at(lat: f64, lon: f64) -> Self {
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();

        Self(Matrix3::new(
            -sin_lon, -sin_lat * cos_lon, cos_lat * cos_lon,
            cos_lon, -sin_lat * sin_lon, cos_lat * sin_lon,
            0.0, cos_lat, sin_lat,
        ))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    pub fn apply(&self, v: &Enu) -> Ecef {
        Ecef(self.0 * v.0)
    }

    /// Inverse rotation (the matrix is orthonormal)
    pub fn transpose_apply(&self, v: &Ecef) -> Enu {
        Enu(self.0.transpose() * v.0)
    }
}

/// Six-parameter kinematic state being solved for.
///
/// Position is relative to the triple's ENU origin. Velocity components are
/// east/north/up at the target's own location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetState {
    pub position: Enu,
    pub velocity: Enu,
}

impl TargetState {
    pub fn new(position: Enu, velocity: Enu) -> Self {
        Self { position, velocity }
    }

    /// Position with zero velocity
    pub fn at_rest(position: Enu) -> Self {
        Self {
            position,
            velocity: Enu::zeros(),
        }
    }

    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.position.0.x,
            self.position.0.y,
            self.position.0.z,
            self.velocity.0.x,
            self.velocity.0.y,
            self.velocity.0.z,
        )
    }

    pub fn from_vector(v: &Vector6<f64>) -> Self {
        Self {
            position: Enu::new(v[0], v[1], v[2]),
            velocity: Enu::new(v[3], v[4], v[5]),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotation_is_orthonormal() {
        let r = EnuToEcef::at(47.3, -122.1);
        let product = r.matrix() * r.matrix().transpose();
        assert_abs_diff_eq!(product, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_at_equator_prime_meridian() {
        // East maps to +Y, north to +Z, up to +X
        let r = EnuToEcef::at(0.0, 0.0);
        let east = r.apply(&Enu::new(1.0, 0.0, 0.0));
        let north = r.apply(&Enu::new(0.0, 1.0, 0.0));
        let up = r.apply(&Enu::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(east.0, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(north.0, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(up.0, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_round_trip() {
        let r = EnuToEcef::at(-33.9, 151.2);
        let v = Enu::new(120.0, -45.0, 3.5);
        let back = r.transpose_apply(&r.apply(&v));
        assert_abs_diff_eq!(back.0, v.0, epsilon = 1e-10);
    }

    #[test]
    fn test_direction_to_coincident_points() {
        let p = Ecef::new(1.0, 2.0, 3.0);
        assert_eq!(p.direction_to(&p), Ecef::zeros());

        let q = Ecef::new(1.0, 2.0, 13.0);
        assert_abs_diff_eq!(p.direction_to(&q).0, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-15);
    }

    #[test]
    fn test_state_vector_layout() {
        let state = TargetState::new(Enu::new(1.0, 2.0, 3.0), Enu::new(4.0, 5.0, 6.0));
        let v = state.to_vector();
        assert_eq!(v, Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(TargetState::from_vector(&v), state);
    }
}
