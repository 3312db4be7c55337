//! Synthetic scenarios for testing and evaluation

pub mod synthetic;

pub use synthetic::{MeasurementNoise, ScenarioGenerator, ScenarioLimits, SensorPair, SyntheticScenario, TruthRecord};
