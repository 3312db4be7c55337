//! Sensor/IoO baseline geometry assessment
//!
//! Three bistatic links only pin down a target when their baselines are
//! spread out. Near-colinear layouts leave a direction unobservable and the
//! solver's normal equations go singular.

use crate::algorithms::measurement::BistaticLink;
use crate::core::{Ecef, Enu};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Smallest angle between two baselines for a well-spread layout (degrees)
pub const MIN_BASELINE_ANGLE_DEG: f64 = 30.0;

/// Longest sensor/IoO baseline for a well-spread layout (meters)
pub const MAX_BASELINE_LENGTH_M: f64 = 30_000.0;

/// Sensor-to-IoO distance in meters
pub fn baseline_length_m(sensor: &Ecef, ioo: &Ecef) -> f64 {
    sensor.distance_to(ioo)
}

/// Angle between the sensor-to-IoO directions of two links, 0 to 180 degrees
pub fn baseline_angle_deg(a: &BistaticLink, b: &BistaticLink) -> f64 {
    let da = a.sensor.direction_to(&a.ioo);
    let db = b.sensor.direction_to(&b.ioo);
    da.dot(&db).clamp(-1.0, 1.0).acos().to_degrees()
}

/// RMS perpendicular distance (meters) of `points` from their best-fit line.
///
/// Zero for fewer than two points or when every point lies on one line.
pub fn colinearity_spread_m(points: &[Enu]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len() as f64;
    let centroid = points.iter().fold(Enu::zeros(), |acc, p| acc + *p) / n;

    let scatter = points.iter().fold(Matrix3::<f64>::zeros(), |acc, p| {
        let d = (*p - centroid).0;
        acc + d * d.transpose()
    });

    // Everything but the dominant axis is off-line spread
    let eigenvalues = scatter.symmetric_eigenvalues();
    let off_line = scatter.trace() - eigenvalues.max();
    (off_line.max(0.0) / n).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryQuality {
    /// Baselines well spread in length and angle
    Good,
    /// Solvable, but a baseline is long or two baselines are nearly parallel
    Marginal,
    /// All sensors and IoOs sit on (or close to) one line
    Degenerate,
}

/// Summary of how well a set of links constrains the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryAssessment {
    pub quality: GeometryQuality,
    pub min_baseline_angle_deg: f64,
    pub max_baseline_m: f64,
    pub colinearity_spread_m: f64,
}

impl GeometryAssessment {
    /// Classify `links`; `points` are the same sensors and IoOs in local coordinates
    pub fn assess(links: &[BistaticLink], points: &[Enu], colinearity_threshold_m: f64) -> Self {
        let max_baseline_m = links
            .iter()
            .map(BistaticLink::baseline_m)
            .fold(0.0, f64::max);

        let mut min_baseline_angle_deg = 180.0_f64;
        for (i, a) in links.iter().enumerate() {
            for b in &links[i + 1..] {
                min_baseline_angle_deg = min_baseline_angle_deg.min(baseline_angle_deg(a, b));
            }
        }

        let spread = colinearity_spread_m(points);

        let quality = if spread < colinearity_threshold_m {
            GeometryQuality::Degenerate
        } else if min_baseline_angle_deg < MIN_BASELINE_ANGLE_DEG || max_baseline_m > MAX_BASELINE_LENGTH_M {
            GeometryQuality::Marginal
        } else {
            GeometryQuality::Good
        };

        Self {
            quality,
            min_baseline_angle_deg,
            max_baseline_m,
            colinearity_spread_m: spread,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.quality == GeometryQuality::Degenerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Ellipsoid;
    use approx::assert_abs_diff_eq;

    fn link(wgs84: &Ellipsoid, sensor: (f64, f64), ioo: (f64, f64)) -> BistaticLink {
        BistaticLink::new(
            wgs84.lla_to_ecef(sensor.0, sensor.1, 0.0),
            wgs84.lla_to_ecef(ioo.0, ioo.1, 0.0),
            100.0,
        )
    }

    #[test]
    fn test_baseline_angle() {
        let a = BistaticLink::new(Ecef::new(0.0, 0.0, 0.0), Ecef::new(1000.0, 0.0, 0.0), 100.0);
        let b = BistaticLink::new(Ecef::new(0.0, 0.0, 0.0), Ecef::new(0.0, 500.0, 0.0), 100.0);
        let c = BistaticLink::new(Ecef::new(5.0, 5.0, 0.0), Ecef::new(-995.0, 5.0, 0.0), 100.0);

        assert_abs_diff_eq!(baseline_angle_deg(&a, &b), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(baseline_angle_deg(&a, &a), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(baseline_angle_deg(&a, &c), 180.0, epsilon = 1e-6);
        assert_abs_diff_eq!(baseline_length_m(&a.sensor, &a.ioo), 1000.0, epsilon = 1e-12);
    }

    #[test]
    fn test_colinearity_spread() {
        let line: Vec<Enu> = (0..6).map(|i| Enu::new(i as f64 * 100.0, i as f64 * 50.0, 0.0)).collect();
        assert_abs_diff_eq!(colinearity_spread_m(&line), 0.0, epsilon = 1e-6);

        // Square of side 2: every corner is 1 m off the best-fit line
        let square = [
            Enu::new(-1.0, -1.0, 0.0),
            Enu::new(1.0, -1.0, 0.0),
            Enu::new(1.0, 1.0, 0.0),
            Enu::new(-1.0, 1.0, 0.0),
        ];
        assert_abs_diff_eq!(colinearity_spread_m(&square), 1.0, epsilon = 1e-9);

        assert_eq!(colinearity_spread_m(&[Enu::new(3.0, 4.0, 5.0)]), 0.0);
    }

    #[test]
    fn test_assess_good_layout() {
        let wgs84 = Ellipsoid::wgs84();
        let links = [
            link(&wgs84, (34.00, -118.00), (34.10, -118.10)),
            link(&wgs84, (34.05, -117.95), (34.05, -118.15)),
            link(&wgs84, (33.97, -117.93), (33.90, -117.80)),
        ];
        let points = [
            Enu::new(-3700.0, -700.0, 0.0),
            Enu::new(-12900.0, 10400.0, 0.0),
            Enu::new(900.0, 4800.0, 0.0),
            Enu::new(-17500.0, 4800.0, 0.0),
            Enu::new(2800.0, -4100.0, 0.0),
            Enu::new(14700.0, -11900.0, 0.0),
        ];

        let assessment = GeometryAssessment::assess(&links, &points, 50.0);
        assert!(assessment.min_baseline_angle_deg >= MIN_BASELINE_ANGLE_DEG);
        assert!(assessment.max_baseline_m < MAX_BASELINE_LENGTH_M);
        assert_eq!(assessment.quality, GeometryQuality::Good);
    }

    #[test]
    fn test_assess_parallel_baselines_marginal() {
        let wgs84 = Ellipsoid::wgs84();
        let links = [
            link(&wgs84, (34.00, -118.00), (34.00, -118.10)),
            link(&wgs84, (34.02, -118.00), (34.02, -118.10)),
            link(&wgs84, (34.04, -118.00), (34.04, -118.10)),
        ];
        let points = [
            Enu::new(0.0, 0.0, 0.0),
            Enu::new(-9200.0, 0.0, 0.0),
            Enu::new(0.0, 2200.0, 0.0),
            Enu::new(-9200.0, 2200.0, 0.0),
        ];

        let assessment = GeometryAssessment::assess(&links, &points, 50.0);
        assert!(assessment.min_baseline_angle_deg < 1.0);
        assert_eq!(assessment.quality, GeometryQuality::Marginal);
    }

    #[test]
    fn test_assess_colinear_degenerate() {
        let wgs84 = Ellipsoid::wgs84();
        let links = [link(&wgs84, (34.00, -118.00), (34.10, -118.00)); 3];
        let points = [Enu::new(0.0, 0.0, 0.0), Enu::new(0.0, 11_000.0, -9.0)];

        let assessment = GeometryAssessment::assess(&links, &points, 50.0);
        assert!(assessment.is_degenerate());
    }
}
