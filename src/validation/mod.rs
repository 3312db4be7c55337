//! Error taxonomy and accuracy evaluation

pub mod accuracy;
pub mod error;

pub use accuracy::{AccuracyReport, AccuracySample, PositionError};
pub use error::{GenerationError, GeolocationError, InputError, SolveFailure, ValidationError};
