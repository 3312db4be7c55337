//! Bistatic geolocation CLI
//!
//! Usage:
//!   bistatic-solver solve detections.json
//!   bistatic-solver generate --num-cases 5 --output-dir test_cases
//!   bistatic-solver evaluate test_cases/3det_case_1_input.json test_cases/3det_case_1_truth.json
//!   bistatic-solver report test_cases
//!
//! Logs go to stderr; stdout carries only the result.

use anyhow::{Context, Result};
use bistatic_solver::api::{OutputFormat, SolverOutput, TextFormatter};
use bistatic_solver::simulation::synthetic::{MeasurementNoise, RECORD_DECIMALS};
use bistatic_solver::validation::accuracy::{AccuracyReport, AccuracySample, DEFAULT_POSITION_THRESHOLD_M};
use bistatic_solver::{DetectionTriple, GeolocationApi, GeolocationConfig, GeolocationError, ScenarioGenerator, TruthRecord};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const INPUT_SUFFIX: &str = "_input.json";
const TRUTH_SUFFIX: &str = "_truth.json";

#[derive(Parser, Debug)]
#[command(
    name = "bistatic-solver",
    about = "Target position and velocity from three bistatic range/Doppler detections"
)]
struct Cli {
    /// Configuration JSON file (defaults are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one detection triple and print the result record
    Solve {
        /// Input JSON with detection1..3 and an optional initial_guess
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Write random input/truth JSON pairs
    Generate {
        #[arg(short, long, default_value_t = 5)]
        num_cases: usize,

        #[arg(short, long, default_value = "test_cases")]
        output_dir: PathBuf,

        /// RNG seed for reproducible cases
        #[arg(long)]
        seed: Option<u64>,

        /// Gaussian range noise, one sigma (km)
        #[arg(long, default_value_t = 0.0)]
        range_noise_km: f64,

        /// Gaussian Doppler noise, one sigma (Hz)
        #[arg(long, default_value_t = 0.0)]
        doppler_noise_hz: f64,
    },
    /// Solve one input and compare it against its truth file
    Evaluate {
        input: PathBuf,
        truth: PathBuf,

        /// Single-line output
        #[arg(long)]
        compact: bool,
    },
    /// Solve every generated case in a directory and summarise the accuracy
    Report {
        dir: PathBuf,

        /// Position error counted as a pass (meters)
        #[arg(long, default_value_t = DEFAULT_POSITION_THRESHOLD_M)]
        threshold_m: f64,
    },
}

fn now_ms() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

fn solve(api: &GeolocationApi, input: &Path, format: OutputFormat) -> Result<ExitCode> {
    let result = api.solve_file(input);
    println!("{}", format.render(&SolverOutput::from(&result))?);

    // Only bad input is a failed run; "No Solution" is a valid answer
    Ok(match result {
        Err(GeolocationError::Input(_)) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn generate(
    api: &GeolocationApi,
    num_cases: usize,
    output_dir: &Path,
    seed: Option<u64>,
    noise: MeasurementNoise,
) -> Result<()> {
    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let physics = &api.config().physics;
    let mut generator = seed
        .map_or_else(ScenarioGenerator::from_entropy, ScenarioGenerator::new)
        .with_ellipsoid(physics.ellipsoid);
    let mut noise_rng = seed.map_or_else(StdRng::from_entropy, |s| StdRng::seed_from_u64(s.wrapping_add(1)));
    let noisy = noise.range_std_km > 0.0 || noise.doppler_std_hz > 0.0;

    for case in 1..=num_cases {
        let scenario = generator.generate(now_ms()?)?;
        let record = if noisy {
            scenario.noisy_record(physics, &noise, &mut noise_rng, Some(RECORD_DECIMALS))?
        } else {
            scenario.to_record(physics, Some(RECORD_DECIMALS))
        };

        let input_path = output_dir.join(format!("3det_case_{case}{INPUT_SUFFIX}"));
        let truth_path = output_dir.join(format!("3det_case_{case}{TRUTH_SUFFIX}"));
        write_json(&input_path, &record)?;
        write_json(&truth_path, &scenario.truth_record())?;

        info!(
            case,
            lat = scenario.target.lat,
            lon = scenario.target.lon,
            alt = scenario.target.alt,
            "wrote {}",
            input_path.display()
        );
    }

    info!("Generated {} cases in {}", num_cases, output_dir.display());
    Ok(())
}

fn evaluate(api: &GeolocationApi, input: &Path, truth_path: &Path, compact: bool) -> Result<()> {
    let triple = DetectionTriple::from_file(input).with_context(|| format!("reading {}", input.display()))?;
    let truth = TruthRecord::from_file(truth_path).with_context(|| format!("reading {}", truth_path.display()))?;
    let formatter = TextFormatter { compact };

    match api.solve(&triple, None) {
        Ok(solution) => {
            let sample = AccuracySample::new(&solution.position, &solution.velocity, &truth.position(), &truth.velocity());
            println!("{}", formatter.format_text(&SolverOutput::Solution(solution.to_record())));
            println!("{}", formatter.format_accuracy(&sample));
        }
        Err(failure) => println!("No Solution ({failure})"),
    }
    Ok(())
}

/// `(input, truth)` paths of every generated case in `dir`, sorted
fn case_files(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(INPUT_SUFFIX) {
            let truth = dir.join(format!("{stem}{TRUTH_SUFFIX}"));
            if truth.exists() {
                cases.push((path.clone(), truth));
            } else {
                warn!("no truth file for {}", path.display());
            }
        }
    }
    cases.sort();
    Ok(cases)
}

fn report(api: &GeolocationApi, dir: &Path, threshold_m: f64) -> Result<()> {
    let cases = case_files(dir)?;
    let mut triples = Vec::with_capacity(cases.len());
    let mut truths = Vec::with_capacity(cases.len());
    for (input, truth) in &cases {
        triples.push(DetectionTriple::from_file(input).with_context(|| format!("reading {}", input.display()))?);
        truths.push(TruthRecord::from_file(truth).with_context(|| format!("reading {}", truth.display()))?);
    }

    let results = api.solve_batch(&triples);
    let samples: Vec<AccuracySample> = results
        .iter()
        .zip(&truths)
        .filter_map(|(result, truth)| {
            let solution = result.as_ref().ok()?;
            Some(AccuracySample::new(&solution.position, &solution.velocity, &truth.position(), &truth.velocity()))
        })
        .collect();

    info!("Solved {} of {} cases", samples.len(), cases.len());
    match AccuracyReport::from_errors(&samples, threshold_m) {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => warn!("no case produced a solution"),
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => GeolocationConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => GeolocationConfig::default(),
    };
    let api = GeolocationApi::with_config(config)?;

    match cli.command {
        Command::Solve { input, format } => return solve(&api, &input, format),
        Command::Generate {
            num_cases,
            output_dir,
            seed,
            range_noise_km,
            doppler_noise_hz,
        } => generate(
            &api,
            num_cases,
            &output_dir,
            seed,
            MeasurementNoise::new(range_noise_km, doppler_noise_hz),
        )?,
        Command::Evaluate { input, truth, compact } => evaluate(&api, &input, &truth, compact)?,
        Command::Report { dir, threshold_m } => report(&api, &dir, threshold_m)?,
    }

    Ok(ExitCode::SUCCESS)
}
