//! Error taxonomy for the geolocation pipeline
//!
//! Validation problems stop a request before any solving happens. Solver
//! failures are ordinary data: the caller gets a [`SolveFailure`] explaining
//! why no solution was produced and decides what to do with it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field failed its bounds check
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("detection {index}: {source}")]
    Detection {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("initial guess: {source}")]
    InitialGuess {
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attach the position of the offending detection within its triple
    pub fn in_detection(self, index: usize) -> Self {
        ValidationError::Detection {
            index,
            source: Box::new(self),
        }
    }

    pub fn in_initial_guess(self) -> Self {
        ValidationError::InitialGuess {
            source: Box::new(self),
        }
    }
}

/// Anything that can go wrong turning raw input into a validated triple
#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Why a set of sensors cannot constrain the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DegeneracyKind {
    /// Sensors and IoOs lie within `spread_m` (RMS) of a single line
    Colinear { spread_m: f64 },
    /// The measurement Jacobian lost rank at an iterate
    IllConditioned { condition_number: f64 },
}

/// Reasons the solver returns no solution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    #[error("degenerate geometry: {kind:?}")]
    DegenerateGeometry { kind: DegeneracyKind, iteration: usize },
    #[error("no convergence after {iterations} iterations (residual norm {residual_norm:.3e})")]
    NotConverged { iterations: usize, residual_norm: f64 },
    #[error("damping reached {damping:.1e} at iteration {iteration} without meeting a tolerance")]
    Stalled { iteration: usize, damping: f64 },
    #[error("diverged at iteration {iteration}: {reason}")]
    Diverged { iteration: usize, reason: String },
    #[error("settled on a local minimum with residual norm {residual_norm:.3e}")]
    ResidualTooLarge { residual_norm: f64, iterations: usize },
    #[error("converged to altitude {altitude_m:.0} m, below the {floor_m:.0} m floor")]
    BelowGround {
        altitude_m: f64,
        floor_m: f64,
        iterations: usize,
    },
}

/// Synthetic scenario generation problems
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("no sensor/IoO layout met the baseline constraints after {attempts} attempts")]
    NoValidLayout { attempts: usize },
    #[error("invalid noise level {field} = {value}")]
    InvalidNoise { field: &'static str, value: f64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Top-level error for one geolocation request
#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error(transparent)]
    Input(#[from] InputError),
    /// Rendered as the fixed marker the output record carries on failure
    #[error("No Solution")]
    NoSolution(#[from] SolveFailure),
}

impl GeolocationError {
    pub fn is_no_solution(&self) -> bool {
        matches!(self, GeolocationError::NoSolution(_))
    }
}

impl From<ValidationError> for GeolocationError {
    fn from(err: ValidationError) -> Self {
        GeolocationError::Input(InputError::Validation(err))
    }
}

impl From<serde_json::Error> for GeolocationError {
    fn from(err: serde_json::Error) -> Self {
        GeolocationError::Input(InputError::Json(err))
    }
}
