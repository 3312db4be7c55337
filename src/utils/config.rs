use crate::core::{Ellipsoid, PhysicalConstants};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Levenberg-Marquardt tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration budget (accepted steps)
    pub max_iterations: usize,
    /// Starting damping factor
    pub initial_damping: f64,
    /// Damping never shrinks below this
    pub min_damping: f64,
    /// Damping above this means the solver has stalled
    pub max_damping: f64,
    /// Central-difference step for position columns (meters)
    pub jacobian_position_step_m: f64,
    /// Central-difference step for velocity columns (m/s)
    pub jacobian_velocity_step_m_s: f64,
    /// Position update below which the solve has converged (meters)
    pub position_tolerance_m: f64,
    /// Velocity update below which the solve has converged (m/s)
    pub velocity_tolerance_m_s: f64,
    /// Sum of squared residuals treated as an exact fit
    pub cost_tolerance: f64,
    /// Gradient norm treated as stationary
    pub gradient_tolerance: f64,
    /// Accepted cost decrease, relative to cost, treated as stationary
    pub relative_cost_tolerance: f64,
    /// Clamp on the position part of a single step (meters)
    pub max_position_step_m: f64,
    /// Jacobian condition number above which the geometry is degenerate
    pub max_condition_number: f64,
    /// Residual norm a converged state must stay under
    pub max_residual_norm: f64,
    /// RMS distance from a common line below which the layout is degenerate (meters)
    pub colinearity_threshold_m: f64,
    /// Iterates farther than this from the local origin have diverged (meters)
    pub max_position_radius_m: f64,
    /// Lowest altitude a solution may have; iterates below it are mirrored upwards (meters)
    pub min_altitude_m: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            initial_damping: 1e-3,
            min_damping: 1e-15,
            max_damping: 1e12,
            jacobian_position_step_m: 1.0,
            jacobian_velocity_step_m_s: 0.01,
            position_tolerance_m: 1e-4,
            velocity_tolerance_m_s: 1e-5,
            cost_tolerance: 1e-16,
            gradient_tolerance: 1e-10,
            relative_cost_tolerance: 1e-12,
            max_position_step_m: 10_000.0,
            max_condition_number: 1e10,
            max_residual_norm: 0.05,
            colinearity_threshold_m: 50.0,
            max_position_radius_m: 2_000_000.0,
            min_altitude_m: -1000.0,
        }
    }
}

/// Initial guess heuristic settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Generated seeds never start below this altitude (meters)
    pub altitude_floor_m: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            altitude_floor_m: 1000.0,
        }
    }
}

/// Everything a geolocation run can be tuned with
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub physics: PhysicalConstants,
    pub solver: SolverConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{parameter}' = {value}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("cannot access config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config file '{path}' is not valid: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn require_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            value: value.to_string(),
            reason: "must be positive and finite",
        })
    }
}

impl GeolocationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a JSON config file; missing fields take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        let config: GeolocationConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Serialization {
                path: path_str,
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialization {
            path: path_str.clone(),
            source,
        })?;

        fs::write(&path, content).map_err(|source| ConfigError::Io { path: path_str, source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ellipsoid: &Ellipsoid = &self.physics.ellipsoid;
        require_positive("physics.ellipsoid.semi_major_axis", ellipsoid.semi_major_axis)?;
        require_positive("physics.ellipsoid.semi_minor_axis", ellipsoid.semi_minor_axis)?;
        if ellipsoid.semi_minor_axis > ellipsoid.semi_major_axis {
            return Err(ConfigError::InvalidParameter {
                parameter: "physics.ellipsoid.semi_minor_axis",
                value: ellipsoid.semi_minor_axis.to_string(),
                reason: "must not exceed the semi-major axis",
            });
        }
        require_positive("physics.speed_of_light_m_s", self.physics.speed_of_light_m_s)?;

        let solver = &self.solver;
        if solver.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.max_iterations",
                value: "0".to_string(),
                reason: "at least one iteration is required",
            });
        }
        require_positive("solver.initial_damping", solver.initial_damping)?;
        require_positive("solver.min_damping", solver.min_damping)?;
        require_positive("solver.max_damping", solver.max_damping)?;
        if solver.min_damping > solver.initial_damping || solver.initial_damping > solver.max_damping {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.initial_damping",
                value: solver.initial_damping.to_string(),
                reason: "must lie between min_damping and max_damping",
            });
        }
        require_positive("solver.jacobian_position_step_m", solver.jacobian_position_step_m)?;
        require_positive("solver.jacobian_velocity_step_m_s", solver.jacobian_velocity_step_m_s)?;
        require_positive("solver.position_tolerance_m", solver.position_tolerance_m)?;
        require_positive("solver.velocity_tolerance_m_s", solver.velocity_tolerance_m_s)?;
        require_positive("solver.cost_tolerance", solver.cost_tolerance)?;
        require_positive("solver.gradient_tolerance", solver.gradient_tolerance)?;
        require_positive("solver.relative_cost_tolerance", solver.relative_cost_tolerance)?;
        require_positive("solver.max_position_step_m", solver.max_position_step_m)?;
        require_positive("solver.max_condition_number", solver.max_condition_number)?;
        require_positive("solver.max_residual_norm", solver.max_residual_norm)?;
        require_positive("solver.max_position_radius_m", solver.max_position_radius_m)?;
        if !(solver.colinearity_threshold_m.is_finite() && solver.colinearity_threshold_m >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.colinearity_threshold_m",
                value: solver.colinearity_threshold_m.to_string(),
                reason: "must be zero or positive",
            });
        }

        if !(solver.min_altitude_m.is_finite() && (-100_000.0..=0.0).contains(&solver.min_altitude_m)) {
            return Err(ConfigError::InvalidParameter {
                parameter: "solver.min_altitude_m",
                value: solver.min_altitude_m.to_string(),
                reason: "must lie in [-100000, 0]",
            });
        }

        if !(self.seed.altitude_floor_m.is_finite() && (0.0..=100_000.0).contains(&self.seed.altitude_floor_m)) {
            return Err(ConfigError::InvalidParameter {
                parameter: "seed.altitude_floor_m",
                value: self.seed.altitude_floor_m.to_string(),
                reason: "must lie in [0, 100000]",
            });
        }

        Ok(())
    }
}
