use crate::algorithms::geodesy::normalize_longitude;
use crate::core::{Enu, Geodetic, METERS_PER_DEGREE};
use serde::{Deserialize, Serialize};

/// Position error below which a case counts as solved (meters)
pub const DEFAULT_POSITION_THRESHOLD_M: f64 = 200.0;

/// `a - b` in degrees, wrapped into [-180, 180)
pub fn longitude_difference(a: f64, b: f64) -> f64 {
    normalize_longitude(a - b)
}

/// Position error metrics between an estimate and the truth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionError {
    /// North error (meters)
    pub north_m: f64,
    /// East error (meters), scaled by cos(latitude) of the truth
    pub east_m: f64,
    /// Altitude error (meters)
    pub vertical_m: f64,
    /// Horizontal error magnitude (meters)
    pub horizontal_m: f64,
    /// 3-D error magnitude (meters)
    pub total_m: f64,
}

impl PositionError {
    /// Flat-earth error of `estimate` against `truth`, safe across the antimeridian
    pub fn between(estimate: &Geodetic, truth: &Geodetic) -> Self {
        let north_m = (estimate.lat - truth.lat) * METERS_PER_DEGREE;
        let east_m = longitude_difference(estimate.lon, truth.lon)
            * METERS_PER_DEGREE
            * truth.lat.to_radians().cos();
        let vertical_m = estimate.alt - truth.alt;
        let horizontal_m = north_m.hypot(east_m);

        Self {
            north_m,
            east_m,
            vertical_m,
            horizontal_m,
            total_m: horizontal_m.hypot(vertical_m),
        }
    }
}

/// Magnitude of the ENU velocity difference (m/s)
pub fn velocity_error(estimate: &Enu, truth: &Enu) -> f64 {
    estimate.distance_to(truth)
}

/// Difference between the horizontal headings of two velocities, 0 to 180 degrees
pub fn heading_error_deg(estimate: &Enu, truth: &Enu) -> f64 {
    let heading = |v: &Enu| v.east().atan2(v.north()).to_degrees();
    normalize_longitude(heading(estimate) - heading(truth)).abs()
}

/// Errors of one solved case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracySample {
    pub position: PositionError,
    /// m/s
    pub velocity_error: f64,
}

impl AccuracySample {
    pub fn new(
        estimate_position: &Geodetic,
        estimate_velocity: &Enu,
        truth_position: &Geodetic,
        truth_velocity: &Enu,
    ) -> Self {
        Self {
            position: PositionError::between(estimate_position, truth_position),
            velocity_error: velocity_error(estimate_velocity, truth_velocity),
        }
    }
}

/// Statistics of a scalar error over several cases
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    pub mean: f64,
    pub rmse: f64,
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
}

impl ErrorStatistics {
    /// `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let rmse = (values.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            rmse,
            std_dev: variance.sqrt(),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

/// Aggregate accuracy over a batch of evaluated cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub sample_count: usize,
    pub position: ErrorStatistics,
    pub velocity: ErrorStatistics,
    /// Position threshold used for `within_threshold_rate` (meters)
    pub threshold_m: f64,
    /// Fraction of samples whose total position error is within the threshold
    pub within_threshold_rate: f64,
}

impl AccuracyReport {
    pub fn from_errors(samples: &[AccuracySample], threshold_m: f64) -> Option<Self> {
        let position_errors: Vec<f64> = samples.iter().map(|s| s.position.total_m).collect();
        let velocity_errors: Vec<f64> = samples.iter().map(|s| s.velocity_error).collect();

        let position = ErrorStatistics::from_values(&position_errors)?;
        let velocity = ErrorStatistics::from_values(&velocity_errors)?;
        let within = position_errors.iter().filter(|&&e| e <= threshold_m).count();

        Some(Self {
            sample_count: samples.len(),
            position,
            velocity,
            threshold_m,
            within_threshold_rate: within as f64 / samples.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_longitude_difference_wraps() {
        assert_abs_diff_eq!(longitude_difference(179.9999, -179.9999), -0.0002, epsilon = 1e-9);
        assert_abs_diff_eq!(longitude_difference(-179.9999, 179.9999), 0.0002, epsilon = 1e-9);
        assert_abs_diff_eq!(longitude_difference(10.0, -20.0), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_position_error_across_antimeridian() {
        let estimate = Geodetic::new(0.0, 179.9999, 1000.0);
        let truth = Geodetic::new(0.0, -179.9999, 1000.0);

        let error = PositionError::between(&estimate, &truth);
        println!("antimeridian error: {:.3} m", error.total_m);
        assert!(error.total_m < 50.0);
        assert_abs_diff_eq!(error.total_m, 22.2222, epsilon = 1e-3);
    }

    #[test]
    fn test_position_error_components() {
        let truth = Geodetic::new(60.0, 10.0, 5000.0);
        let estimate = Geodetic::new(60.001, 10.002, 5030.0);

        let error = PositionError::between(&estimate, &truth);
        assert_abs_diff_eq!(error.north_m, 111.111, epsilon = 1e-6);
        // cos(60) halves the east scale
        assert_abs_diff_eq!(error.east_m, 111.111, epsilon = 1e-6);
        assert_abs_diff_eq!(error.vertical_m, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(error.total_m, (2.0 * 111.111f64.powi(2) + 900.0).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_velocity_and_heading_error() {
        let truth = Enu::new(0.0, 200.0, 0.0);
        let estimate = Enu::new(200.0, 0.0, 0.0);
        assert_abs_diff_eq!(velocity_error(&estimate, &truth), 200.0 * 2f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(heading_error_deg(&estimate, &truth), 90.0, epsilon = 1e-9);

        // Reversed velocity is the classic sign-convention failure
        assert_abs_diff_eq!(heading_error_deg(&(-truth), &truth), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_accuracy_report() {
        let truth = Geodetic::new(0.0, 0.0, 1000.0);
        let samples: Vec<AccuracySample> = [10.0, 20.0, 300.0]
            .iter()
            .map(|alt_offset| {
                AccuracySample::new(
                    &Geodetic::new(0.0, 0.0, 1000.0 + alt_offset),
                    &Enu::new(1.0, 0.0, 0.0),
                    &truth,
                    &Enu::zeros(),
                )
            })
            .collect();

        let report = AccuracyReport::from_errors(&samples, DEFAULT_POSITION_THRESHOLD_M).unwrap();
        assert_eq!(report.sample_count, 3);
        assert_abs_diff_eq!(report.position.mean, 110.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.position.max, 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.position.min, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.velocity.rmse, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.within_threshold_rate, 2.0 / 3.0, epsilon = 1e-12);

        assert!(AccuracyReport::from_errors(&[], DEFAULT_POSITION_THRESHOLD_M).is_none());
    }
}
