//! Result types handed back to callers

use crate::algorithms::geometry::GeometryAssessment;
use crate::algorithms::lm_solver::Termination;
use crate::core::{Enu, Geodetic, TargetState};
use crate::validation::error::GeolocationError;
use serde::{Deserialize, Serialize};

/// Where the solver's starting state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedSource {
    /// Passed directly to `solve`
    Explicit,
    /// The `initial_guess` carried by the input
    Provided,
    /// Ellipse-center heuristic
    Generated,
}

/// Converged position and velocity of the target
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Timestamp of the first detection (ms)
    pub timestamp: u64,
    pub position: Geodetic,
    /// East/north/up at `position` (m/s)
    pub velocity: Enu,
    /// The converged state in the triple's local frame
    pub local_state: TargetState,
    /// Range (km) and Doppler (Hz) residuals, interleaved per detection
    pub residuals: Vec<f64>,
    /// Euclidean norm of `residuals`
    pub convergence_metric: f64,
    pub iterations: usize,
    pub termination: Termination,
    pub seed_source: SeedSource,
    pub geometry: GeometryAssessment,
}

impl Solution {
    pub fn to_record(&self) -> SolutionRecord {
        SolutionRecord {
            timestamp: self.timestamp,
            latitude: self.position.lat,
            longitude: self.position.lon,
            altitude: self.position.alt,
            velocity_east: self.velocity.east(),
            velocity_north: self.velocity.north(),
            velocity_up: self.velocity.up(),
            convergence_metric: self.convergence_metric,
            residuals: self.residuals.clone(),
        }
    }
}

/// Output record for a converged solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub timestamp: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub velocity_east: f64,
    pub velocity_north: f64,
    pub velocity_up: f64,
    pub convergence_metric: f64,
    pub residuals: Vec<f64>,
}

/// Output record for anything else, including `"No Solution"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

/// Exactly one JSON object per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolverOutput {
    Solution(SolutionRecord),
    Error(ErrorRecord),
}

impl SolverOutput {
    pub fn is_solution(&self) -> bool {
        matches!(self, SolverOutput::Solution(_))
    }
}

impl From<&Result<Solution, GeolocationError>> for SolverOutput {
    fn from(result: &Result<Solution, GeolocationError>) -> Self {
        match result {
            Ok(solution) => SolverOutput::Solution(solution.to_record()),
            Err(err) => SolverOutput::Error(ErrorRecord {
                error: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error::{SolveFailure, ValidationError};

    #[test]
    fn test_no_solution_record() {
        let result: Result<Solution, GeolocationError> = Err(SolveFailure::Stalled {
            iteration: 4,
            damping: 1e13,
        }
        .into());
        let output = SolverOutput::from(&result);

        assert!(!output.is_solution());
        assert_eq!(serde_json::to_string(&output).unwrap(), r#"{"error":"No Solution"}"#);
    }

    #[test]
    fn test_validation_error_record_names_the_field() {
        let result: Result<Solution, GeolocationError> = Err(ValidationError::NotPositive {
            field: "bistatic_range_km",
            value: -1.0,
        }
        .in_detection(3)
        .into());

        let json = serde_json::to_value(SolverOutput::from(&result)).unwrap();
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("detection 3"));
        assert!(message.contains("bistatic_range_km"));
    }

    #[test]
    fn test_solution_record_parses_back_as_solution() {
        let record = SolutionRecord {
            timestamp: 1_700_000_000_000,
            latitude: 34.1,
            longitude: -117.9,
            altitude: 8000.0,
            velocity_east: 120.0,
            velocity_north: -40.0,
            velocity_up: 1.5,
            convergence_metric: 1e-9,
            residuals: vec![0.0; 6],
        };
        let json = serde_json::to_string(&SolverOutput::Solution(record.clone())).unwrap();
        assert!(!json.contains("Solution"));

        let parsed: SolverOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SolverOutput::Solution(record));
    }
}
