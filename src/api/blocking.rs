//! Blocking geolocation API
//!
//! One call per detection triple: choose a seed, refine it, convert the
//! result back to geodetic coordinates. Each call builds its own local frame
//! and measurement model, so an instance can be shared across threads.

use crate::algorithms::geometry::{GeometryAssessment, GeometryQuality};
use crate::algorithms::geodesy::LocalFrame;
use crate::algorithms::initial_guess::EllipseCenterHeuristic;
use crate::algorithms::lm_solver::LevenbergMarquardt;
use crate::api::types::{SeedSource, Solution, SolverOutput};
use crate::core::{Enu, TargetState};
use crate::processing::detection::DetectionTriple;
use crate::utils::config::{ConfigError, GeolocationConfig};
use crate::validation::error::{GeolocationError, SolveFailure};
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

pub struct GeolocationApi {
    config: GeolocationConfig,
    solver: LevenbergMarquardt,
    heuristic: EllipseCenterHeuristic,
}

impl Default for GeolocationApi {
    fn default() -> Self {
        Self::build(GeolocationConfig::default())
    }
}

impl GeolocationApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// API with a custom configuration, rejected if it does not validate
    pub fn with_config(config: GeolocationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GeolocationConfig) -> Self {
        Self {
            solver: LevenbergMarquardt::new(config.solver.clone()),
            heuristic: EllipseCenterHeuristic::new(config.seed.altitude_floor_m),
            config,
        }
    }

    pub fn config(&self) -> &GeolocationConfig {
        &self.config
    }

    /// Baseline geometry of `triple` in its own local frame
    pub fn assess_geometry(&self, triple: &DetectionTriple) -> GeometryAssessment {
        let ellipsoid = &self.config.physics.ellipsoid;
        let frame = triple.local_frame(ellipsoid);
        let points: Vec<Enu> = triple
            .foci(&frame)
            .into_iter()
            .flat_map(|(sensor, ioo)| [sensor, ioo])
            .collect();
        GeometryAssessment::assess(
            &triple.links(ellipsoid),
            &points,
            self.config.solver.colinearity_threshold_m,
        )
    }

    /// Explicit seed first, then the triple's own initial guess, then the heuristic
    fn choose_seed(
        &self,
        triple: &DetectionTriple,
        frame: &LocalFrame,
        seed: Option<TargetState>,
    ) -> (TargetState, SeedSource) {
        if let Some(state) = seed {
            return (state, SeedSource::Explicit);
        }
        match triple.initial_guess_enu(frame.ellipsoid()) {
            Some(state) => (state, SeedSource::Provided),
            None => (self.heuristic.seed(&triple.foci(frame)), SeedSource::Generated),
        }
    }

    /// Solve one triple.
    ///
    /// `seed` is a state in the triple's local frame (see
    /// [`DetectionTriple::local_frame`]). Without one, the triple's initial
    /// guess is used when present, else the ellipse-center heuristic.
    pub fn solve(&self, triple: &DetectionTriple, seed: Option<TargetState>) -> Result<Solution, SolveFailure> {
        let model = triple.measurement_model(&self.config.physics);
        let frame = *model.frame();

        let geometry = self.assess_geometry(triple);
        match geometry.quality {
            GeometryQuality::Good => debug!(?geometry, "geometry"),
            GeometryQuality::Marginal | GeometryQuality::Degenerate => warn!(?geometry, "weak sensor geometry"),
        }

        let (seed, seed_source) = self.choose_seed(triple, &frame, seed);
        let seed_position = frame.local_to_geodetic(&seed.position);
        debug!(
            "Using {} initial guess: pos=({:.6}, {:.6}, {:.1}) vel=({:.1}, {:.1}, {:.1})",
            match seed_source {
                SeedSource::Generated => "generated",
                SeedSource::Provided | SeedSource::Explicit => "provided",
            },
            seed_position.lat,
            seed_position.lon,
            seed_position.alt,
            seed.velocity.east(),
            seed.velocity.north(),
            seed.velocity.up(),
        );

        info!(timestamp = triple.timestamp(), "solving detection triple");
        let lm = self.solver.solve(&model, &seed).map_err(|failure| {
            warn!(%failure, "no solution");
            failure
        })?;

        let position = frame.local_to_geodetic(&lm.state.position);
        info!(
            lat = position.lat,
            lon = position.lon,
            alt = position.alt,
            iterations = lm.iterations,
            residual_norm = lm.residual_norm,
            "solution converged"
        );

        Ok(Solution {
            timestamp: triple.timestamp(),
            position,
            velocity: lm.state.velocity,
            local_state: lm.state,
            residuals: lm.residuals.iter().copied().collect(),
            convergence_metric: lm.residual_norm,
            iterations: lm.iterations,
            termination: lm.termination,
            seed_source,
            geometry,
        })
    }

    /// Parse, validate and solve one JSON request
    pub fn solve_str(&self, json: &str) -> Result<Solution, GeolocationError> {
        let triple = DetectionTriple::from_json(json)?;
        Ok(self.solve(&triple, None)?)
    }

    pub fn solve_file<P: AsRef<Path>>(&self, path: P) -> Result<Solution, GeolocationError> {
        let triple = DetectionTriple::from_file(path)?;
        Ok(self.solve(&triple, None)?)
    }

    /// Request JSON in, output record out
    pub fn solve_json(&self, json: &str) -> SolverOutput {
        SolverOutput::from(&self.solve_str(json))
    }

    /// Independent solves spread over scoped worker threads, results in input order
    pub fn solve_batch(&self, triples: &[DetectionTriple]) -> Vec<Result<Solution, SolveFailure>> {
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let chunk_size = triples.len().div_ceil(workers).max(1);

        thread::scope(|scope| {
            let handles: Vec<_> = triples
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || chunk.iter().map(|triple| self.solve(triple, None)).collect::<Vec<_>>())
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }
}
