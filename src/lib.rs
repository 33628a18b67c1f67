//! Stockaudit - stock movement anomaly detection for multi-unit hospital inventories
//!
//! This library validates movement records, estimates per-(material, unit)
//! baselines, flags outliers with Z-score and IQR tests, ranks them by
//! severity and estimates the financial impact of the recording failures.

pub mod anomaly;
pub mod baseline;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod impact;
pub mod ingest;
pub mod json_output;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod report;
pub mod severity;
pub mod validation;
