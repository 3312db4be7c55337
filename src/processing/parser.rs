//! Wire records for detection input
//!
//! These mirror the JSON handed over by the data-loading side one to one.
//! They carry no invariants; [`crate::processing::detection`] validates them.

use crate::validation::error::InputError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One sensor/IoO observation as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub sensor_lat: f64,
    pub sensor_lon: f64,
    pub ioo_lat: f64,
    pub ioo_lon: f64,
    pub freq_mhz: f64,
    pub timestamp: u64,
    pub bistatic_range_km: f64,
    pub doppler_hz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionLla {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEnu {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialGuessRecord {
    pub position_lla: PositionLla,
    pub velocity_enu: VelocityEnu,
}

/// Three simultaneous detections plus an optional caller seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleRecord {
    pub detection1: DetectionRecord,
    pub detection2: DetectionRecord,
    pub detection3: DetectionRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_guess: Option<InitialGuessRecord>,
}

impl TripleRecord {
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

    /// Detections in wire order
    pub fn detections(&self) -> [&DetectionRecord; 3] {
        [&self.detection1, &self.detection2, &self.detection3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "detection1": {"sensor_lat": 34.0, "sensor_lon": -118.0, "ioo_lat": 34.1, "ioo_lon": -118.1,
                       "freq_mhz": 100.0, "timestamp": 1700000000000, "bistatic_range_km": 38.2, "doppler_hz": -12.5},
        "detection2": {"sensor_lat": 34.05, "sensor_lon": -117.95, "ioo_lat": 34.1, "ioo_lon": -118.1,
                       "freq_mhz": 100.0, "timestamp": 1700000000000, "bistatic_range_km": 31.7, "doppler_hz": 4.25},
        "detection3": {"sensor_lat": 33.97, "sensor_lon": -117.93, "ioo_lat": 33.9, "ioo_lon": -117.8,
                       "freq_mhz": 100.0, "timestamp": 1700000000000, "bistatic_range_km": 45.9, "doppler_hz": 30.0}
    }"#;

    #[test]
    fn test_parse_triple_without_guess() {
        let record = TripleRecord::from_json(SAMPLE).unwrap();
        assert_eq!(record.detection1.timestamp, 1_700_000_000_000);
        assert_eq!(record.detection3.doppler_hz, 30.0);
        assert!(record.initial_guess.is_none());
        assert_eq!(record.detections()[1].sensor_lat, 34.05);

        // Absent guess stays absent on the way back out
        let json = record.to_json_pretty().unwrap();
        assert!(!json.contains("initial_guess"));
    }

    #[test]
    fn test_parse_triple_with_guess() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value["initial_guess"] = serde_json::json!({
            "position_lla": {"lat": 34.1, "lon": -117.9, "alt": 5000.0},
            "velocity_enu": {"east": 100.0, "north": -20.0, "up": 0.0}
        });

        let record = TripleRecord::from_json(&value.to_string()).unwrap();
        let guess = record.initial_guess.unwrap();
        assert_eq!(guess.position_lla.alt, 5000.0);
        assert_eq!(guess.velocity_enu.north, -20.0);
    }

    #[test]
    fn test_missing_detection_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();
        value.as_object_mut().unwrap().remove("detection2");

        let err = TripleRecord::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, InputError::Json(_)));
        assert!(err.to_string().contains("detection2"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let record = TripleRecord::from_file(file.path()).unwrap();
        assert_eq!(record.detection2.bistatic_range_km, 31.7);

        assert!(matches!(
            TripleRecord::from_file("/nonexistent/detections.json"),
            Err(InputError::Io(_))
        ));
    }
}
