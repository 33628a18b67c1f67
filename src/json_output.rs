//! JSON output format for analysis reports
//!
//! --format json implementation

use crate::pipeline::AnalysisReport;
use serde::Serialize;

pub const FORMAT_ID: &str = "stockaudit-json-v1";

/// Versioned JSON envelope around an analysis report
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub version: &'static str,
    pub format: &'static str,
    #[serde(flatten)]
    pub report: &'a AnalysisReport,
}

impl<'a> JsonOutput<'a> {
    pub fn new(report: &'a AnalysisReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            format: FORMAT_ID,
            report,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
