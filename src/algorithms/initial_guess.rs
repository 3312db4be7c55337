//! Ellipse-center seed for the solver
//!
//! Each detection constrains the target to an ellipsoid of constant bistatic
//! range with the sensor and IoO as foci. The seed is the mean of the three
//! foci midpoints, lifted to an altitude floor, at rest.

use crate::core::{Enu, TargetState};
use tracing::debug;

/// Minimum seed altitude (meters) unless configured otherwise
pub const DEFAULT_ALTITUDE_FLOOR_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseCenterHeuristic {
    /// Seed altitude never drops below this (meters, local up)
    pub altitude_floor_m: f64,
}

impl Default for EllipseCenterHeuristic {
    fn default() -> Self {
        Self {
            altitude_floor_m: DEFAULT_ALTITUDE_FLOOR_M,
        }
    }
}

impl EllipseCenterHeuristic {
    pub fn new(altitude_floor_m: f64) -> Self {
        Self { altitude_floor_m }
    }

    /// Midpoint between the two foci
    pub fn ellipse_center(sensor: &Enu, ioo: &Enu) -> Enu {
        (*sensor + *ioo) * 0.5
    }

    /// Seed state from `(sensor, ioo)` pairs in the triple's local frame
    pub fn seed(&self, foci: &[(Enu, Enu)]) -> TargetState {
        if foci.is_empty() {
            return TargetState::at_rest(Enu::new(0.0, 0.0, self.altitude_floor_m));
        }

        let sum = foci
            .iter()
            .map(|(sensor, ioo)| Self::ellipse_center(sensor, ioo))
            .fold(Enu::zeros(), |acc, center| acc + center);
        let mean = sum / foci.len() as f64;

        let position = Enu::new(mean.east(), mean.north(), mean.up().max(self.altitude_floor_m));
        debug!(
            east = position.east(),
            north = position.north(),
            up = position.up(),
            "Ellipse-center seed"
        );
        TargetState::at_rest(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_hand_computed_seed() {
        let foci = [
            (Enu::new(0.0, 0.0, 0.0), Enu::new(10_000.0, 0.0, 0.0)),
            (Enu::new(2000.0, 4000.0, 0.0), Enu::new(-6000.0, 8000.0, 0.0)),
            (Enu::new(-1000.0, -3000.0, 0.0), Enu::new(1000.0, -9000.0, 0.0)),
        ];
        // Centers: (5000, 0), (-2000, 6000), (0, -6000)
        let seed = EllipseCenterHeuristic::default().seed(&foci);

        assert_abs_diff_eq!(seed.position.east(), 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(seed.position.north(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(seed.position.up(), DEFAULT_ALTITUDE_FLOOR_M, epsilon = 1e-9);
        assert_eq!(seed.velocity, Enu::zeros());
    }

    #[test]
    fn test_altitude_never_below_floor() {
        let underground = [
            (Enu::new(0.0, 0.0, -40.0), Enu::new(30_000.0, 0.0, -70.0)),
            (Enu::new(0.0, 5000.0, -2.0), Enu::new(0.0, -30_000.0, -70.0)),
            (Enu::new(4000.0, 0.0, -1.0), Enu::new(-20_000.0, 0.0, -30.0)),
        ];
        for floor in [0.0, 500.0, 1000.0, 2500.0] {
            let seed = EllipseCenterHeuristic::new(floor).seed(&underground);
            assert!(seed.position.up() >= floor);
        }
    }

    #[test]
    fn test_elevated_foci_keep_mean_altitude() {
        let foci = [
            (Enu::new(0.0, 0.0, 3000.0), Enu::new(0.0, 0.0, 5000.0)),
            (Enu::new(0.0, 0.0, 3000.0), Enu::new(0.0, 0.0, 5000.0)),
        ];
        let seed = EllipseCenterHeuristic::default().seed(&foci);
        assert_abs_diff_eq!(seed.position.up(), 4000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_foci_fall_back_to_floor() {
        let seed = EllipseCenterHeuristic::new(1200.0).seed(&[]);
        assert_eq!(seed.position, Enu::new(0.0, 0.0, 1200.0));
    }
}
