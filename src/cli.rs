//! CLI argument parsing for stockaudit

use crate::ingest::InputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text report (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format with one scored row per record
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "stockaudit")]
#[command(version)]
#[command(
    about = "Stock movement anomaly detection, severity ranking and financial impact",
    long_about = None
)]
pub struct Cli {
    /// Movement records (CSV or JSON)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// TOML configuration file (thresholds, prices, indirect costs)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Input encoding (guessed from the file extension when omitted)
    #[arg(long = "input-format", value_enum, value_name = "FORMAT")]
    pub input_format: Option<InputFormat>,

    /// Z-score threshold in standard deviations (overrides config)
    #[arg(long = "z-threshold", value_name = "SIGMA")]
    pub z_threshold: Option<f64>,

    /// IQR fence multiplier (overrides config). Must lie strictly between
    /// severity.iqr_watch and severity.iqr_critical (1.0 and 3.0 by default)
    #[arg(long = "iqr-multiplier", value_name = "K")]
    pub iqr_multiplier: Option<f64>,

    /// Only run data-quality checks
    #[arg(long = "validate-only")]
    pub validate_only: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
