//! Validated detections and the triple handed to the solver
//!
//! Construction is the only place bounds are checked. Once built, a
//! [`Detection`] or [`DetectionTriple`] is read-only.

use crate::algorithms::geodesy::{mean_longitude, LocalFrame};
use crate::algorithms::measurement::{BistaticLink, Measurement, MeasurementModel, Observation};
use crate::core::{Ellipsoid, Enu, Geodetic, PhysicalConstants, TargetState};
use crate::processing::parser::{DetectionRecord, InitialGuessRecord, PositionLla, TripleRecord, VelocityEnu};
use crate::validation::error::{InputError, ValidationError};
use std::path::Path;

/// Caller seeds above this altitude are rejected (meters)
pub const MAX_GUESS_ALTITUDE_M: f64 = 100_000.0;

/// Bound on each caller-seeded velocity component (m/s)
pub const MAX_GUESS_VELOCITY_M_S: f64 = 1000.0;

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value, min, max })
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        Err(ValidationError::NotFinite { field, value })
    } else if value <= 0.0 {
        Err(ValidationError::NotPositive { field, value })
    } else {
        Ok(())
    }
}

/// One sensor/IoO observation of the target
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    sensor: Geodetic,
    ioo: Geodetic,
    freq_mhz: f64,
    timestamp: u64,
    bistatic_range_km: f64,
    doppler_hz: f64,
}

impl Detection {
    pub fn new(record: &DetectionRecord) -> Result<Self, ValidationError> {
        check_range("sensor_lat", record.sensor_lat, -90.0, 90.0)?;
        check_range("sensor_lon", record.sensor_lon, -180.0, 180.0)?;
        check_range("ioo_lat", record.ioo_lat, -90.0, 90.0)?;
        check_range("ioo_lon", record.ioo_lon, -180.0, 180.0)?;
        check_positive("freq_mhz", record.freq_mhz)?;
        check_positive("bistatic_range_km", record.bistatic_range_km)?;
        if !record.doppler_hz.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "doppler_hz",
                value: record.doppler_hz,
            });
        }

        Ok(Self {
            sensor: Geodetic::surface(record.sensor_lat, record.sensor_lon),
            ioo: Geodetic::surface(record.ioo_lat, record.ioo_lon),
            freq_mhz: record.freq_mhz,
            timestamp: record.timestamp,
            bistatic_range_km: record.bistatic_range_km,
            doppler_hz: record.doppler_hz,
        })
    }

    /// Sensor location (altitude 0)
    pub fn sensor(&self) -> &Geodetic {
        &self.sensor
    }

    /// Illuminator location (altitude 0)
    pub fn ioo(&self) -> &Geodetic {
        &self.ioo
    }

    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn bistatic_range_km(&self) -> f64 {
        self.bistatic_range_km
    }

    pub fn doppler_hz(&self) -> f64 {
        self.doppler_hz
    }

    pub fn link(&self, ellipsoid: &Ellipsoid) -> BistaticLink {
        BistaticLink::new(
            ellipsoid.geodetic_to_ecef(&self.sensor),
            ellipsoid.geodetic_to_ecef(&self.ioo),
            self.freq_mhz,
        )
    }

    pub fn measurement(&self) -> Measurement {
        Measurement {
            range_km: self.bistatic_range_km,
            doppler_hz: self.doppler_hz,
        }
    }

    pub fn to_record(&self) -> DetectionRecord {
        DetectionRecord {
            sensor_lat: self.sensor.lat,
            sensor_lon: self.sensor.lon,
            ioo_lat: self.ioo.lat,
            ioo_lon: self.ioo.lon,
            freq_mhz: self.freq_mhz,
            timestamp: self.timestamp,
            bistatic_range_km: self.bistatic_range_km,
            doppler_hz: self.doppler_hz,
        }
    }
}

/// Caller-supplied seed: geodetic position plus ENU velocity at that position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    position: Geodetic,
    velocity: Enu,
}

impl InitialGuess {
    pub fn new(position: Geodetic, velocity: Enu) -> Result<Self, ValidationError> {
        check_range("position_lla.lat", position.lat, -90.0, 90.0)?;
        check_range("position_lla.lon", position.lon, -180.0, 180.0)?;
        check_range("position_lla.alt", position.alt, 0.0, MAX_GUESS_ALTITUDE_M)?;
        check_range("velocity_enu.east", velocity.east(), -MAX_GUESS_VELOCITY_M_S, MAX_GUESS_VELOCITY_M_S)?;
        check_range("velocity_enu.north", velocity.north(), -MAX_GUESS_VELOCITY_M_S, MAX_GUESS_VELOCITY_M_S)?;
        check_range("velocity_enu.up", velocity.up(), -MAX_GUESS_VELOCITY_M_S, MAX_GUESS_VELOCITY_M_S)?;
        Ok(Self { position, velocity })
    }

    pub fn from_record(record: &InitialGuessRecord) -> Result<Self, ValidationError> {
        let p = record.position_lla;
        let v = record.velocity_enu;
        Self::new(Geodetic::new(p.lat, p.lon, p.alt), Enu::new(v.east, v.north, v.up))
    }

    pub fn position(&self) -> &Geodetic {
        &self.position
    }

    pub fn velocity(&self) -> &Enu {
        &self.velocity
    }

    pub fn to_record(&self) -> InitialGuessRecord {
        InitialGuessRecord {
            position_lla: PositionLla {
                lat: self.position.lat,
                lon: self.position.lon,
                alt: self.position.alt,
            },
            velocity_enu: VelocityEnu {
                east: self.velocity.east(),
                north: self.velocity.north(),
                up: self.velocity.up(),
            },
        }
    }
}

/// Three simultaneous detections and an optional caller seed
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTriple {
    detections: [Detection; 3],
    initial_guess: Option<InitialGuess>,
}

impl DetectionTriple {
    pub fn new(detections: [Detection; 3], initial_guess: Option<InitialGuess>) -> Self {
        Self {
            detections,
            initial_guess,
        }
    }

    /// Validate a wire record; errors name the 1-based detection they came from
    pub fn from_record(record: &TripleRecord) -> Result<Self, ValidationError> {
        let [d1, d2, d3] = record.detections();
        let detections = [
            Detection::new(d1).map_err(|e| e.in_detection(1))?,
            Detection::new(d2).map_err(|e| e.in_detection(2))?,
            Detection::new(d3).map_err(|e| e.in_detection(3))?,
        ];

        let initial_guess = record
            .initial_guess
            .as_ref()
            .map(InitialGuess::from_record)
            .transpose()
            .map_err(ValidationError::in_initial_guess)?;

        Ok(Self::new(detections, initial_guess))
    }

    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let record = TripleRecord::from_json(json)?;
        Ok(Self::from_record(&record)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let record = TripleRecord::from_file(path)?;
        Ok(Self::from_record(&record)?)
    }

    pub fn to_record(&self) -> TripleRecord {
        let [d1, d2, d3] = &self.detections;
        TripleRecord {
            detection1: d1.to_record(),
            detection2: d2.to_record(),
            detection3: d3.to_record(),
            initial_guess: self.initial_guess.as_ref().map(InitialGuess::to_record),
        }
    }

    pub fn detections(&self) -> &[Detection; 3] {
        &self.detections
    }

    pub fn initial_guess(&self) -> Option<&InitialGuess> {
        self.initial_guess.as_ref()
    }

    /// Same triple with the caller seed replaced
    pub fn with_initial_guess(mut self, initial_guess: Option<InitialGuess>) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    /// Timestamp reported with the solution (the first detection's)
    pub fn timestamp(&self) -> u64 {
        self.detections[0].timestamp
    }

    /// Centroid of the three sensors at altitude 0, wrap-aware in longitude
    pub fn enu_origin(&self) -> Geodetic {
        let lat = self.detections.iter().map(|d| d.sensor.lat).sum::<f64>() / 3.0;
        let longitudes: Vec<f64> = self.detections.iter().map(|d| d.sensor.lon).collect();
        Geodetic::surface(lat, mean_longitude(&longitudes))
    }

    pub fn local_frame(&self, ellipsoid: &Ellipsoid) -> LocalFrame {
        LocalFrame::new(*ellipsoid, self.enu_origin())
    }

    /// Caller seed expressed in this triple's local frame, if one was given
    pub fn initial_guess_enu(&self, ellipsoid: &Ellipsoid) -> Option<TargetState> {
        let guess = self.initial_guess.as_ref()?;
        let frame = self.local_frame(ellipsoid);
        Some(TargetState::new(frame.geodetic_to_local(&guess.position), guess.velocity))
    }

    /// `(sensor, ioo)` pairs in the local frame, in detection order
    pub fn foci(&self, frame: &LocalFrame) -> Vec<(Enu, Enu)> {
        self.detections
            .iter()
            .map(|d| (frame.geodetic_to_local(&d.sensor), frame.geodetic_to_local(&d.ioo)))
            .collect()
    }

    pub fn links(&self, ellipsoid: &Ellipsoid) -> Vec<BistaticLink> {
        self.detections.iter().map(|d| d.link(ellipsoid)).collect()
    }

    /// Measurement model over this triple in its own local frame
    pub fn measurement_model(&self, physics: &PhysicalConstants) -> MeasurementModel {
        let frame = self.local_frame(&physics.ellipsoid);
        let observations = self
            .detections
            .iter()
            .map(|d| Observation {
                link: d.link(&physics.ellipsoid),
                measured: d.measurement(),
            })
            .collect();
        MeasurementModel::new(frame, observations, physics.speed_of_light_m_s)
    }
}
