//! Geolocation algorithms

pub mod geodesy;
pub mod geometry;
pub mod initial_guess;
pub mod lm_solver;
pub mod measurement;

pub use geodesy::LocalFrame;
pub use geometry::{GeometryAssessment, GeometryQuality};
pub use initial_guess::EllipseCenterHeuristic;
pub use lm_solver::{LevenbergMarquardt, LmSolution, Termination};
pub use measurement::{BistaticLink, Measurement, MeasurementModel, Observation};
