//! Configuration

pub mod config;

pub use config::{ConfigError, GeolocationConfig, SeedConfig, SolverConfig};
