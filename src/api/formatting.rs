//! Output formatting for solver results
//!
//! JSON is the wire format. Text and CSV are for people and log files.

use crate::api::types::{SolutionRecord, SolverOutput};
use crate::validation::accuracy::AccuracySample;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per result
    Json,
    /// Indented JSON
    PrettyJson,
    /// Human-readable text
    Text,
    /// CSV row with header
    Csv,
}

impl OutputFormat {
    pub fn render(&self, output: &SolverOutput) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Json => JsonFormatter::new().format_json(output),
            OutputFormat::PrettyJson => JsonFormatter::pretty().format_json(output),
            OutputFormat::Text => Ok(TextFormatter::new().format_text(output)),
            OutputFormat::Csv => {
                let csv = CsvFormatter::new();
                Ok(format!("{}\n{}", csv.header(), csv.format_csv(output)))
            }
        }
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, output: &SolverOutput) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(output)
        } else {
            serde_json::to_string(output)
        }
    }
}

/// Human-readable text
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// Single line instead of a block
    pub compact: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact() -> Self {
        Self { compact: true }
    }

    pub fn format_text(&self, output: &SolverOutput) -> String {
        match output {
            SolverOutput::Solution(record) if self.compact => format!(
                "Pos: {:.6}°, {:.6}°, {:.1}m | Vel: E{:.1} N{:.1} U{:.1} m/s | Metric: {:.3e}",
                record.latitude,
                record.longitude,
                record.altitude,
                record.velocity_east,
                record.velocity_north,
                record.velocity_up,
                record.convergence_metric
            ),
            SolverOutput::Solution(record) => Self::solution_block(record),
            SolverOutput::Error(error) => format!("Error: {}", error.error),
        }
    }

    fn solution_block(record: &SolutionRecord) -> String {
        let mut output = String::new();
        output.push_str("Position (Geodetic):\n");
        output.push_str(&format!("  Latitude:  {:.6}°\n", record.latitude));
        output.push_str(&format!("  Longitude: {:.6}°\n", record.longitude));
        output.push_str(&format!("  Altitude:  {:.1} m\n", record.altitude));
        output.push_str("Velocity (ENU):\n");
        output.push_str(&format!("  East:  {:.2} m/s\n", record.velocity_east));
        output.push_str(&format!("  North: {:.2} m/s\n", record.velocity_north));
        output.push_str(&format!("  Up:    {:.2} m/s\n", record.velocity_up));
        output.push_str("Fit:\n");
        output.push_str(&format!("  Convergence metric: {:.3e}\n", record.convergence_metric));
        for (i, pair) in record.residuals.chunks(2).enumerate() {
            if let [range_km, doppler_hz] = pair {
                output.push_str(&format!(
                    "  Detection {}: range {:+.3e} km, Doppler {:+.3e} Hz\n",
                    i + 1,
                    range_km,
                    doppler_hz
                ));
            }
        }
        output.push_str(&format!("Timestamp: {} ms", record.timestamp));
        output
    }

    /// Comparison of a solution against its truth record
    pub fn format_accuracy(&self, sample: &AccuracySample) -> String {
        let p = &sample.position;
        if self.compact {
            return format!(
                "Pos err: {:.1}m (N{:.1} E{:.1} U{:.1}) | Vel err: {:.2} m/s",
                p.total_m, p.north_m, p.east_m, p.vertical_m, sample.velocity_error
            );
        }

        let mut output = String::from("Accuracy:\n");
        output.push_str(&format!("  North error:      {:.1} m\n", p.north_m));
        output.push_str(&format!("  East error:       {:.1} m\n", p.east_m));
        output.push_str(&format!("  Vertical error:   {:.1} m\n", p.vertical_m));
        output.push_str(&format!("  Horizontal error: {:.1} m\n", p.horizontal_m));
        output.push_str(&format!("  Position error:   {:.1} m\n", p.total_m));
        output.push_str(&format!("  Velocity error:   {:.2} m/s", sample.velocity_error));
        output
    }
}

/// CSV formatter for data logging
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn header(&self) -> String {
        "timestamp,latitude,longitude,altitude,velocity_east,velocity_north,velocity_up,convergence_metric,error"
            .to_string()
    }

    pub fn format_csv(&self, output: &SolverOutput) -> String {
        match output {
            SolverOutput::Solution(r) => format!(
                "{},{:.8},{:.8},{:.3},{:.4},{:.4},{:.4},{:e},",
                r.timestamp,
                r.latitude,
                r.longitude,
                r.altitude,
                r.velocity_east,
                r.velocity_north,
                r.velocity_up,
                r.convergence_metric
            ),
            SolverOutput::Error(e) => format!(",,,,,,,,\"{}\"", e.error.replace('"', "\"\"")),
        }
    }
}
