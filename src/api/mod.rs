//! Caller-facing API
//!
//! [`GeolocationApi`] runs the whole pipeline for one detection triple or a
//! batch of them. The output records and formatters shape what the command
//! line prints.

pub mod blocking;
pub mod formatting;
pub mod types;

pub use blocking::GeolocationApi;
pub use formatting::{CsvFormatter, JsonFormatter, OutputFormat, TextFormatter};
pub use types::{ErrorRecord, SeedSource, Solution, SolutionRecord, SolverOutput};
