//! Levenberg-Marquardt refinement of the six-parameter target state
//!
//! Minimises the squared norm of the interleaved range/Doppler residuals over
//! local ENU position and velocity. The Jacobian is taken by central
//! differences; damping follows the gain ratio between the actual and the
//! linearised cost decrease.

use crate::algorithms::geometry::colinearity_spread_m;
use crate::algorithms::measurement::MeasurementModel;
use crate::core::{Enu, TargetState};
use crate::utils::config::SolverConfig;
use crate::validation::error::{DegeneracyKind, SolveFailure};
use nalgebra::{DMatrix, DVector, Vector6};
use tracing::{debug, warn};

/// Smallest gain ratio for which a trial step is kept
const MIN_GAIN_RATIO: f64 = 1e-4;

/// Gain ratio above which the model is trusted and damping shrinks
const GOOD_GAIN_RATIO: f64 = 0.75;

/// Which tolerance ended a successful solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Cost,
    Gradient,
    Step,
    RelativeCost,
}

/// Converged state and its quality
#[derive(Debug, Clone, PartialEq)]
pub struct LmSolution {
    pub state: TargetState,
    /// Residuals at `state`, range and Doppler interleaved
    pub residuals: DVector<f64>,
    pub residual_norm: f64,
    /// Accepted steps taken
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    config: SolverConfig,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

fn split_norms(v: &Vector6<f64>) -> (f64, f64) {
    (v.fixed_rows::<3>(0).norm(), v.fixed_rows::<3>(3).norm())
}

impl LevenbergMarquardt {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Refine `seed` against the measurements in `model`.
    ///
    /// Returns a state only when a tolerance is met with a small residual;
    /// every other outcome is a [`SolveFailure`].
    pub fn solve(&self, model: &MeasurementModel, seed: &TargetState) -> Result<LmSolution, SolveFailure> {
        self.check_layout(model)?;

        let cfg = &self.config;
        let mut x = seed.to_vector();
        self.mirror_below_floor(model, &mut x, 0);
        let mut residuals = model.residuals(&TargetState::from_vector(&x));
        let mut cost = residuals.norm_squared();
        let mut lambda = cfg.initial_damping;
        let mut nu = 2.0;

        for iteration in 0..cfg.max_iterations {
            if !cost.is_finite() || !x.iter().all(|v| v.is_finite()) {
                return Err(self.diverged(iteration, "non-finite state or residuals".to_string()));
            }
            let radius = x.fixed_rows::<3>(0).norm();
            if radius > cfg.max_position_radius_m {
                return Err(self.diverged(
                    iteration,
                    format!("position {:.0} m from origin exceeds {:.0} m", radius, cfg.max_position_radius_m),
                ));
            }

            if cost <= cfg.cost_tolerance {
                return self.finish(model, x, iteration, Termination::Cost);
            }

            let jacobian = self.jacobian(model, &x);
            if !jacobian.iter().all(|v| v.is_finite()) {
                return Err(self.diverged(iteration, "non-finite Jacobian".to_string()));
            }

            let condition_number = condition_number(&jacobian);
            if condition_number > cfg.max_condition_number {
                warn!(iteration, condition_number, "Jacobian is rank deficient");
                return Err(SolveFailure::DegenerateGeometry {
                    kind: DegeneracyKind::IllConditioned { condition_number },
                    iteration,
                });
            }

            let jtj = jacobian.tr_mul(&jacobian);
            let gradient = jacobian.tr_mul(&residuals);
            if gradient.norm() <= cfg.gradient_tolerance {
                return self.finish(model, x, iteration, Termination::Gradient);
            }

            debug!(iteration, cost, lambda, condition_number, "LM iteration");

            // Retry with heavier damping until a step is accepted
            loop {
                let step = self.damped_step(&jtj, &gradient, lambda, iteration)?;
                let step = self.clamp_step(step);

                let (position_step, velocity_step) = split_norms(&step);
                if position_step <= cfg.position_tolerance_m && velocity_step <= cfg.velocity_tolerance_m_s {
                    return self.finish(model, x, iteration, Termination::Step);
                }

                let candidate = x + step;
                let candidate_residuals = model.residuals(&TargetState::from_vector(&candidate));
                let candidate_cost = candidate_residuals.norm_squared();

                let step_dyn = DVector::from_column_slice(step.as_slice());
                let linearised = &residuals + &jacobian * &step_dyn;
                let predicted_reduction = cost - linearised.norm_squared();
                let actual_reduction = cost - candidate_cost;
                let gain_ratio = if predicted_reduction > 0.0 {
                    actual_reduction / predicted_reduction
                } else {
                    -1.0
                };

                if candidate_cost.is_finite() && gain_ratio > MIN_GAIN_RATIO {
                    x = candidate;
                    residuals = candidate_residuals;
                    cost = candidate_cost;

                    if gain_ratio > GOOD_GAIN_RATIO {
                        lambda = (lambda / nu).max(cfg.min_damping);
                    }
                    nu = 2.0;

                    if self.mirror_below_floor(model, &mut x, iteration) {
                        residuals = model.residuals(&TargetState::from_vector(&x));
                        cost = residuals.norm_squared();
                    } else if actual_reduction <= cfg.relative_cost_tolerance * cost {
                        return self.finish(model, x, iteration + 1, Termination::RelativeCost);
                    }
                    break;
                }

                lambda *= nu;
                nu *= 2.0;
                if lambda > cfg.max_damping {
                    warn!(iteration, lambda, cost, "LM damping ceiling reached");
                    return Err(SolveFailure::Stalled {
                        iteration,
                        damping: lambda,
                    });
                }
            }
        }

        let residual_norm = cost.sqrt();
        warn!(iterations = cfg.max_iterations, residual_norm, "LM iteration budget exhausted");
        Err(SolveFailure::NotConverged {
            iterations: cfg.max_iterations,
            residual_norm,
        })
    }

    /// Reject layouts whose sensors and IoOs all sit near one line
    fn check_layout(&self, model: &MeasurementModel) -> Result<(), SolveFailure> {
        let frame = model.frame();
        let points: Vec<Enu> = model
            .observations()
            .iter()
            .flat_map(|obs| [frame.ecef_to_local(&obs.link.sensor), frame.ecef_to_local(&obs.link.ioo)])
            .collect();

        let spread_m = colinearity_spread_m(&points);
        if spread_m < self.config.colinearity_threshold_m {
            warn!(spread_m, "sensors and illuminators are colinear");
            return Err(SolveFailure::DegenerateGeometry {
                kind: DegeneracyKind::Colinear { spread_m },
                iteration: 0,
            });
        }
        Ok(())
    }

    /// Central-difference Jacobian of the residual vector
    fn jacobian(&self, model: &MeasurementModel, x: &Vector6<f64>) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(model.residual_count(), 6);

        for k in 0..6 {
            let h = if k < 3 {
                self.config.jacobian_position_step_m
            } else {
                self.config.jacobian_velocity_step_m_s
            };

            let mut forward = *x;
            forward[k] += h;
            let mut backward = *x;
            backward[k] -= h;

            let column = (model.residuals(&TargetState::from_vector(&forward))
                - model.residuals(&TargetState::from_vector(&backward)))
                / (2.0 * h);
            jacobian.set_column(k, &column);
        }

        jacobian
    }

    /// Solve `(JᵀJ + λ·diag(JᵀJ)) h = -Jᵀr`
    fn damped_step(
        &self,
        jtj: &DMatrix<f64>,
        gradient: &DVector<f64>,
        lambda: f64,
        iteration: usize,
    ) -> Result<Vector6<f64>, SolveFailure> {
        let diagonal = jtj.diagonal();
        let floor = diagonal.max() * 1e-9;

        let mut augmented = jtj.clone();
        for i in 0..augmented.nrows() {
            augmented[(i, i)] += lambda * diagonal[i].max(floor).max(f64::MIN_POSITIVE);
        }
        let rhs = -gradient;

        let step = match augmented.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&rhs),
            None => {
                let svd = augmented.svd(true, true);
                let eps = svd.singular_values.max() * f64::EPSILON * 6.0;
                svd.solve(&rhs, eps).map_err(|reason| SolveFailure::Diverged {
                    iteration,
                    reason: format!("damped normal equations unsolvable: {}", reason),
                })?
            }
        };

        Ok(Vector6::from_column_slice(step.as_slice()))
    }

    /// Scale the whole step so its position part stays within the clamp
    fn clamp_step(&self, step: Vector6<f64>) -> Vector6<f64> {
        let (position_step, _) = split_norms(&step);
        if position_step > self.config.max_position_step_m {
            step * (self.config.max_position_step_m / position_step)
        } else {
            step
        }
    }

    /// Reflect an iterate below the altitude floor through the local horizontal
    /// plane, where the underground twin of the target sits
    fn mirror_below_floor(&self, model: &MeasurementModel, x: &mut Vector6<f64>, iteration: usize) -> bool {
        if !(x[2] < 0.0) {
            return false;
        }
        let altitude_m = model.frame().local_to_geodetic(&Enu::new(x[0], x[1], x[2])).alt;
        if !(altitude_m < self.config.min_altitude_m) {
            return false;
        }

        debug!(iteration, altitude_m, "mirroring iterate above the altitude floor");
        x[2] = -x[2];
        x[5] = -x[5];
        true
    }

    fn diverged(&self, iteration: usize, reason: String) -> SolveFailure {
        warn!(iteration, %reason, "LM diverged");
        SolveFailure::Diverged { iteration, reason }
    }

    fn finish(
        &self,
        model: &MeasurementModel,
        x: Vector6<f64>,
        iterations: usize,
        termination: Termination,
    ) -> Result<LmSolution, SolveFailure> {
        let state = TargetState::from_vector(&x);
        let residuals = model.residuals(&state);
        let residual_norm = residuals.norm();

        if !(residual_norm <= self.config.max_residual_norm) {
            warn!(residual_norm, iterations, ?termination, "LM stopped away from a fit");
            return Err(SolveFailure::ResidualTooLarge {
                residual_norm,
                iterations,
            });
        }

        let altitude_m = model.frame().local_to_geodetic(&state.position).alt;
        if !(altitude_m >= self.config.min_altitude_m) {
            warn!(altitude_m, iterations, "LM converged below the altitude floor");
            return Err(SolveFailure::BelowGround {
                altitude_m,
                floor_m: self.config.min_altitude_m,
                iterations,
            });
        }

        debug!(residual_norm, iterations, ?termination, "LM converged");
        Ok(LmSolution {
            state,
            residuals,
            residual_norm,
            iterations,
            termination,
        })
    }
}

/// Ratio of largest to smallest singular value; infinite when rank deficient
pub fn condition_number(matrix: &DMatrix<f64>) -> f64 {
    let singular_values = matrix.singular_values();
    let s_max = singular_values.max();
    let s_min = singular_values.min();
    if s_min <= s_max * f64::EPSILON {
        f64::INFINITY
    } else {
        s_max / s_min
    }
}
