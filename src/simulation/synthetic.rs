//! Synthetic detections from a known truth state
//!
//! Measurements are produced by the same [`BistaticLink`] functions the
//! solver inverts, with the truth velocity rotated into ECEF at the target's
//! own location. A scenario built here therefore has zero residual at its
//! truth state under [`crate::algorithms::MeasurementModel`].

use crate::algorithms::geodesy::{enu_to_ecef_rotation, normalize_longitude, LocalFrame};
use crate::algorithms::geometry::{baseline_angle_deg, MAX_BASELINE_LENGTH_M, MIN_BASELINE_ANGLE_DEG};
use crate::algorithms::measurement::{BistaticLink, Measurement};
use crate::core::{Ellipsoid, Enu, Geodetic, PhysicalConstants, TargetState, METERS_PER_DEGREE};
use crate::processing::detection::DetectionTriple;
use crate::processing::parser::{DetectionRecord, TripleRecord};
use crate::validation::error::{GenerationError, InputError, ValidationError};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Decimal places kept for range and Doppler in generated input files
pub const RECORD_DECIMALS: i32 = 5;

/// Sensor/IoO index pairs tried, in order, for each random layout
const PAIRINGS: [[(usize, usize); 3]; 3] = [
    [(0, 0), (1, 0), (2, 1)],
    [(0, 0), (1, 1), (2, 1)],
    [(0, 1), (1, 0), (2, 1)],
];

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Ground sensor and the illuminator it listens to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPair {
    pub sensor: Geodetic,
    pub ioo: Geodetic,
}

impl SensorPair {
    /// Both ends are placed on the ellipsoid surface
    pub fn new(sensor_lat: f64, sensor_lon: f64, ioo_lat: f64, ioo_lon: f64) -> Self {
        Self {
            sensor: Geodetic::surface(sensor_lat, sensor_lon),
            ioo: Geodetic::surface(ioo_lat, ioo_lon),
        }
    }

    pub fn link(&self, ellipsoid: &Ellipsoid, freq_mhz: f64) -> BistaticLink {
        BistaticLink::new(
            ellipsoid.geodetic_to_ecef(&self.sensor),
            ellipsoid.geodetic_to_ecef(&self.ioo),
            freq_mhz,
        )
    }
}

/// Zero-mean Gaussian measurement noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementNoise {
    pub range_std_km: f64,
    pub doppler_std_hz: f64,
}

impl MeasurementNoise {
    pub fn new(range_std_km: f64, doppler_std_hz: f64) -> Self {
        Self {
            range_std_km,
            doppler_std_hz,
        }
    }

    fn distributions(&self) -> Result<(Normal<f64>, Normal<f64>), GenerationError> {
        let range = Normal::new(0.0, self.range_std_km).map_err(|_| GenerationError::InvalidNoise {
            field: "range_std_km",
            value: self.range_std_km,
        })?;
        let doppler = Normal::new(0.0, self.doppler_std_hz).map_err(|_| GenerationError::InvalidNoise {
            field: "doppler_std_hz",
            value: self.doppler_std_hz,
        })?;
        Ok((range, doppler))
    }
}

/// Truth file written alongside each generated input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthRecord {
    pub timestamp: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub velocity_east: f64,
    pub velocity_north: f64,
    pub velocity_up: f64,
}

impl TruthRecord {
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn position(&self) -> Geodetic {
        Geodetic::new(self.latitude, self.longitude, self.altitude)
    }

    pub fn velocity(&self) -> Enu {
        Enu::new(self.velocity_east, self.velocity_north, self.velocity_up)
    }
}

/// Three sensor/IoO pairs observing one target with known kinematics
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticScenario {
    pub pairs: [SensorPair; 3],
    pub target: Geodetic,
    /// East/north/up at the target's location (m/s)
    pub velocity: Enu,
    pub freq_mhz: f64,
    pub timestamp: u64,
}

impl SyntheticScenario {
    /// Exact range and Doppler for each pair, in pair order
    pub fn measurements(&self, physics: &PhysicalConstants) -> [Measurement; 3] {
        let ellipsoid = &physics.ellipsoid;
        let target = ellipsoid.geodetic_to_ecef(&self.target);
        let velocity = enu_to_ecef_rotation(self.target.lat, self.target.lon).apply(&self.velocity);

        self.pairs.map(|pair| {
            let link = pair.link(ellipsoid, self.freq_mhz);
            Measurement {
                range_km: link.range_km(&target),
                doppler_hz: link.doppler_hz(&target, &velocity, physics.speed_of_light_m_s),
            }
        })
    }

    fn record_from(&self, measurements: [Measurement; 3], decimals: Option<i32>) -> TripleRecord {
        let round = |value: f64| decimals.map_or(value, |d| round_to(value, d));
        let [detection1, detection2, detection3] = std::array::from_fn(|i| {
            let pair = &self.pairs[i];
            DetectionRecord {
                sensor_lat: pair.sensor.lat,
                sensor_lon: pair.sensor.lon,
                ioo_lat: pair.ioo.lat,
                ioo_lon: pair.ioo.lon,
                freq_mhz: self.freq_mhz,
                timestamp: self.timestamp,
                bistatic_range_km: round(measurements[i].range_km),
                doppler_hz: round(measurements[i].doppler_hz),
            }
        });

        TripleRecord {
            detection1,
            detection2,
            detection3,
            initial_guess: None,
        }
    }

    /// Wire record of the exact measurements, optionally rounded
    pub fn to_record(&self, physics: &PhysicalConstants, decimals: Option<i32>) -> TripleRecord {
        self.record_from(self.measurements(physics), decimals)
    }

    pub fn detection_triple(&self, physics: &PhysicalConstants) -> Result<DetectionTriple, ValidationError> {
        DetectionTriple::from_record(&self.to_record(physics, None))
    }

    /// Wire record whose measurements carry independent Gaussian noise,
    /// rounded after the noise is added
    pub fn noisy_record<R: Rng + ?Sized>(
        &self,
        physics: &PhysicalConstants,
        noise: &MeasurementNoise,
        rng: &mut R,
        decimals: Option<i32>,
    ) -> Result<TripleRecord, GenerationError> {
        let (range_noise, doppler_noise) = noise.distributions()?;
        let noisy = self.measurements(physics).map(|m| Measurement {
            range_km: m.range_km + range_noise.sample(&mut *rng),
            doppler_hz: m.doppler_hz + doppler_noise.sample(&mut *rng),
        });

        Ok(self.record_from(noisy, decimals))
    }

    pub fn noisy_detection_triple<R: Rng + ?Sized>(
        &self,
        physics: &PhysicalConstants,
        noise: &MeasurementNoise,
        rng: &mut R,
    ) -> Result<DetectionTriple, GenerationError> {
        let record = self.noisy_record(physics, noise, rng, None)?;
        Ok(DetectionTriple::from_record(&record)?)
    }

    pub fn truth_record(&self) -> TruthRecord {
        TruthRecord {
            timestamp: self.timestamp,
            latitude: self.target.lat,
            longitude: self.target.lon,
            altitude: self.target.alt,
            velocity_east: self.velocity.east(),
            velocity_north: self.velocity.north(),
            velocity_up: self.velocity.up(),
        }
    }

    /// Truth expressed in `frame`
    pub fn truth_state(&self, frame: &LocalFrame) -> TargetState {
        TargetState::new(frame.geodetic_to_local(&self.target), self.velocity)
    }
}

/// Bounds the random scenario generator draws from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioLimits {
    /// Layout centres are drawn within ±this latitude (degrees)
    pub max_center_lat_deg: f64,
    pub sensor_distance_m: (f64, f64),
    pub ioo_distance_m: (f64, f64),
    pub max_baseline_m: f64,
    pub min_baseline_angle_deg: f64,
    /// Target distance from the centre as multiples of the longest baseline
    pub target_distance_factor: (f64, f64),
    pub target_altitude_m: (f64, f64),
    pub horizontal_speed_m_s: (f64, f64),
    pub max_vertical_speed_m_s: f64,
    pub freq_mhz: f64,
    pub max_attempts: usize,
}

impl Default for ScenarioLimits {
    fn default() -> Self {
        Self {
            max_center_lat_deg: 60.0,
            sensor_distance_m: (2_000.0, 8_000.0),
            ioo_distance_m: (5_000.0, 15_000.0),
            max_baseline_m: MAX_BASELINE_LENGTH_M,
            min_baseline_angle_deg: MIN_BASELINE_ANGLE_DEG,
            target_distance_factor: (0.3, 2.0),
            target_altitude_m: (0.0, 30_000.0),
            horizontal_speed_m_s: (50.0, 500.0),
            max_vertical_speed_m_s: 50.0,
            freq_mhz: 100.0,
            max_attempts: 1000,
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Point at a uniform distance and bearing from `center`, flat-earth offsets
fn position_around<R: Rng + ?Sized>(
    rng: &mut R,
    center: &Geodetic,
    distance_m: (f64, f64),
    altitude_m: (f64, f64),
) -> Geodetic {
    let distance = uniform(rng, distance_m);
    let bearing = rng.gen_range(0.0..TAU);
    let lat = center.lat + distance * bearing.cos() / METERS_PER_DEGREE;
    let lon = center.lon + distance * bearing.sin() / (METERS_PER_DEGREE * center.lat.to_radians().cos());
    Geodetic::new(lat, normalize_longitude(lon), uniform(rng, altitude_m))
}

/// Seeded random scenario source
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    rng: StdRng,
    limits: ScenarioLimits,
    ellipsoid: Ellipsoid,
}

impl ScenarioGenerator {
    /// Reproducible generator
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            limits: ScenarioLimits::default(),
            ellipsoid: Ellipsoid::wgs84(),
        }
    }

    pub fn with_limits(mut self, limits: ScenarioLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_ellipsoid(mut self, ellipsoid: Ellipsoid) -> Self {
        self.ellipsoid = ellipsoid;
        self
    }

    pub fn limits(&self) -> &ScenarioLimits {
        &self.limits
    }

    fn accepts(&self, pairs: &[SensorPair; 3]) -> bool {
        let links = pairs.map(|p| p.link(&self.ellipsoid, self.limits.freq_mhz));
        if links.iter().any(|l| l.baseline_m() > self.limits.max_baseline_m) {
            return false;
        }
        (0..3).all(|i| {
            (i + 1..3).all(|j| baseline_angle_deg(&links[i], &links[j]) >= self.limits.min_baseline_angle_deg)
        })
    }

    /// Random centre plus a sensor/IoO layout meeting the baseline limits
    fn layout(&mut self) -> Result<(Geodetic, [SensorPair; 3]), GenerationError> {
        let limits = self.limits.clone();
        let lat_bound = limits.max_center_lat_deg;

        for attempt in 0..limits.max_attempts {
            let center = Geodetic::surface(
                uniform(&mut self.rng, (-lat_bound, lat_bound)),
                uniform(&mut self.rng, (-180.0, 180.0)),
            );
            let sensors: [Geodetic; 3] =
                std::array::from_fn(|_| position_around(&mut self.rng, &center, limits.sensor_distance_m, (0.0, 0.0)));
            let ioos: [Geodetic; 2] =
                std::array::from_fn(|_| position_around(&mut self.rng, &center, limits.ioo_distance_m, (0.0, 0.0)));

            for pairing in PAIRINGS {
                let pairs = pairing.map(|(s, i)| SensorPair {
                    sensor: sensors[s],
                    ioo: ioos[i],
                });
                if self.accepts(&pairs) {
                    debug!(attempt, ?pairing, "accepted sensor layout");
                    return Ok((center, pairs));
                }
            }
        }

        Err(GenerationError::NoValidLayout {
            attempts: limits.max_attempts,
        })
    }

    pub fn generate(&mut self, timestamp: u64) -> Result<SyntheticScenario, GenerationError> {
        let (center, pairs) = self.layout()?;
        let limits = self.limits.clone();

        let longest_baseline = pairs
            .iter()
            .map(|p| p.link(&self.ellipsoid, limits.freq_mhz).baseline_m())
            .fold(0.0, f64::max);
        let (near, far) = limits.target_distance_factor;
        let target = position_around(
            &mut self.rng,
            &center,
            (near * longest_baseline, far * longest_baseline),
            limits.target_altitude_m,
        );

        let speed = uniform(&mut self.rng, limits.horizontal_speed_m_s);
        let heading = self.rng.gen_range(0.0..TAU);
        let vertical = uniform(
            &mut self.rng,
            (-limits.max_vertical_speed_m_s, limits.max_vertical_speed_m_s),
        );

        Ok(SyntheticScenario {
            pairs,
            target,
            velocity: Enu::new(speed * heading.sin(), speed * heading.cos(), vertical),
            freq_mhz: limits.freq_mhz,
            timestamp,
        })
    }
}
