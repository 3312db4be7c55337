//! Multistatic Passive Radar Geolocation
//!
//! Recovers a target's position and velocity from three simultaneous
//! bistatic range/Doppler detections. Each detection pairs a ground sensor
//! with an illuminator of opportunity; the solver refines a six-parameter
//! local ENU state with Levenberg-Marquardt and reports it back in WGS84.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod simulation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{Ecef, Ellipsoid, Enu, EnuToEcef, Geodetic, PhysicalConstants, TargetState};
pub use algorithms::{EllipseCenterHeuristic, LevenbergMarquardt, LocalFrame, MeasurementModel};
pub use processing::{Detection, DetectionTriple, InitialGuess, TripleRecord};
pub use validation::{GeolocationError, InputError, SolveFailure, ValidationError};
pub use simulation::{ScenarioGenerator, SyntheticScenario, TruthRecord};
pub use utils::{ConfigError, GeolocationConfig};
pub use api::{GeolocationApi, OutputFormat, Solution, SolverOutput};
