//! End-to-end analysis run
//!
//! validate → profile → baselines → classification/severity → impact
//!
//! A [`Pipeline`] owns a validated [`AnalysisConfig`]; invalid configuration
//! is rejected at construction, before any record is seen. Runs are pure:
//! the same records always produce the same report.

use crate::anomaly::{classify_records, ClassifiedRecord, DetectionSummary};
use crate::baseline::{estimate_baselines, Baselines};
use crate::config::{AnalysisConfig, ConfigError};
use crate::impact::{estimate_impact, ImpactReport};
use crate::profile::DatasetProfile;
use crate::record::MovementRecord;
use crate::validation::{validate_records, InconsistencyReport};
use serde::Serialize;

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub profile: DatasetProfile,
    pub inconsistencies: InconsistencyReport,
    pub baselines: Baselines,
    pub scores: Vec<ClassifiedRecord>,
    pub detection: DetectionSummary,
    pub impact: ImpactReport,
}

impl AnalysisReport {
    /// Flagged records (Alert or Critical), most severe first, then by |z|
    pub fn flagged(&self) -> Vec<&ClassifiedRecord> {
        let mut flagged: Vec<&ClassifiedRecord> =
            self.scores.iter().filter(|c| c.is_flagged()).collect();
        flagged.sort_by(|a, b| {
            let (sa, sb) = (a.score.as_ref(), b.score.as_ref());
            b.severity().cmp(&a.severity()).then_with(|| {
                let za = sa.map_or(0.0, |s| s.z_score.abs());
                let zb = sb.map_or(0.0, |s| s.z_score.abs());
                zb.partial_cmp(&za).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        flagged
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Data-quality checks only
    pub fn validate(&self, records: &[MovementRecord]) -> InconsistencyReport {
        validate_records(records)
    }

    /// Run the full analysis
    pub fn run(&self, records: &[MovementRecord]) -> AnalysisReport {
        tracing::info!(records = records.len(), "starting analysis run");

        let inconsistencies = validate_records(records);
        let profile = DatasetProfile::from_records(records);
        let baselines = estimate_baselines(records);
        let scores = classify_records(records, &baselines, &self.config);
        let detection = DetectionSummary::from_classified(&scores);
        let impact = estimate_impact(records, &scores, &self.config);

        tracing::info!(
            classified = detection.classified,
            flagged = detection.severity.flagged(),
            z_only = detection.z_only,
            iqr_only = detection.iqr_only,
            total_impact = impact.total_impact,
            "analysis run complete"
        );

        AnalysisReport {
            profile,
            inconsistencies,
            baselines,
            scores,
            detection,
            impact,
        }
    }
}
