//! Outlier classification against group baselines
//!
//! Two independent tests run on every classifiable record:
//!
//! - Z-score: `z = (|q| - mean) / std`, flagged when `|z| > z_threshold`.
//!   Sensitive to single extreme values, weak on small skewed groups.
//! - IQR: flagged when `|q|` lies outside `[Q1 - k*IQR, Q3 + k*IQR]`.
//!   Robust to skew, catches moderate deviations.
//!
//! The flags are kept side by side and their agreement is summarised in
//! [`DetectionSummary`]; the IQR test often catches records the Z-score
//! test misses on small groups.
//!
//! Records without a quantity, or whose group baseline is degenerate, are
//! not classifiable and carry no score.

use crate::baseline::{Baselines, GroupBaseline};
use crate::config::AnalysisConfig;
use crate::record::{serialize_by_group, GroupKey, MovementRecord};
use crate::severity::{self, Severity};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Position of a magnitude relative to the IQR fences
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IqrBand {
    /// Within the watch fence
    Inside,
    /// Beyond the watch fence, within the outlier fence
    Watch,
    /// Beyond the outlier fence (IQR flag set)
    Outlier,
    /// Beyond the critical fence
    Far,
}

/// Outlier signals and severity for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyScore {
    /// |quantity| the tests were run on
    pub magnitude: f64,
    pub z_score: f64,
    /// |z| > z_threshold
    pub z_flag: bool,
    /// Outside the Tukey outlier fence
    pub iqr_flag: bool,
    pub iqr_band: IqrBand,
    /// Percent difference from the group mean; absent when the mean is zero
    pub pct_variation: Option<f64>,
    pub severity: Severity,
}

/// Why a record carries no score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unclassified {
    MissingQuantity,
    InsufficientBaseline,
}

/// Classification outcome for one input record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    /// Index into the input record slice
    pub index: usize,
    pub group: GroupKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<AnomalyScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unclassified: Option<Unclassified>,
}

impl ClassifiedRecord {
    pub fn severity(&self) -> Option<Severity> {
        self.score.as_ref().map(|s| s.severity)
    }

    pub fn is_flagged(&self) -> bool {
        self.severity().is_some_and(Severity::is_flagged)
    }
}

/// Score a magnitude against its group baseline
///
/// Returns `None` when the baseline is degenerate (fewer than two records
/// or zero spread), so no division by zero can occur.
pub fn score_magnitude(
    magnitude: f64,
    baseline: &GroupBaseline,
    config: &AnalysisConfig,
) -> Option<AnomalyScore> {
    if baseline.is_degenerate() || !magnitude.is_finite() {
        return None;
    }

    let z_score = (magnitude - baseline.mean) / baseline.std_dev;
    let z_flag = z_score.abs() > config.z_threshold;
    let iqr_band = iqr_band(magnitude, baseline, config);
    let iqr_flag = iqr_band >= IqrBand::Outlier;

    let pct_variation = if baseline.mean != 0.0 {
        Some((magnitude - baseline.mean) / baseline.mean * 100.0)
    } else {
        None
    };

    let severity = severity::rank(z_score, z_flag, iqr_band, &config.severity);

    Some(AnomalyScore {
        magnitude,
        z_score,
        z_flag,
        iqr_flag,
        iqr_band,
        pct_variation,
        severity,
    })
}

/// Locate `magnitude` among the watch, outlier and critical fences
///
/// With a zero IQR the fences collapse onto the quartiles and distance can't
/// be graded, so only the outlier test applies.
pub fn iqr_band(magnitude: f64, baseline: &GroupBaseline, config: &AnalysisConfig) -> IqrBand {
    let outlier = baseline.outside_fence(magnitude, config.iqr_multiplier);

    if baseline.iqr <= 0.0 {
        return if outlier {
            IqrBand::Outlier
        } else {
            IqrBand::Inside
        };
    }

    if baseline.outside_fence(magnitude, config.severity.iqr_critical) {
        IqrBand::Far
    } else if outlier {
        IqrBand::Outlier
    } else if baseline.outside_fence(magnitude, config.severity.iqr_watch) {
        IqrBand::Watch
    } else {
        IqrBand::Inside
    }
}

/// Classify every record; output is index-aligned with `records`
pub fn classify_records(
    records: &[MovementRecord],
    baselines: &Baselines,
    config: &AnalysisConfig,
) -> Vec<ClassifiedRecord> {
    records
        .par_iter()
        .enumerate()
        .map(|(index, record)| classify_record(index, record, baselines, config))
        .collect()
}

fn classify_record(
    index: usize,
    record: &MovementRecord,
    baselines: &Baselines,
    config: &AnalysisConfig,
) -> ClassifiedRecord {
    let group = record.group();
    let (score, unclassified) = match record.magnitude() {
        None => (None, Some(Unclassified::MissingQuantity)),
        Some(magnitude) => match baselines
            .get(&group)
            .and_then(|b| score_magnitude(magnitude, b, config))
        {
            Some(score) => (Some(score), None),
            None => (None, Some(Unclassified::InsufficientBaseline)),
        },
    };

    ClassifiedRecord {
        index,
        group,
        score,
        unclassified,
    }
}

/// Severity counts for one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub normal: usize,
    pub attention: usize,
    pub alert: usize,
    pub critical: usize,
}

impl SeverityCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Normal => self.normal += 1,
            Severity::Attention => self.attention += 1,
            Severity::Alert => self.alert += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Normal => self.normal,
            Severity::Attention => self.attention,
            Severity::Alert => self.alert,
            Severity::Critical => self.critical,
        }
    }

    pub fn flagged(&self) -> usize {
        self.alert + self.critical
    }
}

/// Agreement between the two tests, plus severity distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub classified: usize,
    pub missing_quantity: usize,
    pub insufficient_baseline: usize,
    pub z_only: usize,
    pub iqr_only: usize,
    pub both: usize,
    pub neither: usize,
    pub severity: SeverityCounts,
    #[serde(serialize_with = "serialize_by_group")]
    pub by_group: BTreeMap<GroupKey, SeverityCounts>,
}

impl DetectionSummary {
    pub fn from_classified(classified: &[ClassifiedRecord]) -> Self {
        let mut summary = Self::default();

        for record in classified {
            let Some(score) = &record.score else {
                match record.unclassified {
                    Some(Unclassified::MissingQuantity) => summary.missing_quantity += 1,
                    Some(Unclassified::InsufficientBaseline) | None => {
                        summary.insufficient_baseline += 1
                    }
                }
                continue;
            };

            summary.classified += 1;
            match (score.z_flag, score.iqr_flag) {
                (true, true) => summary.both += 1,
                (true, false) => summary.z_only += 1,
                (false, true) => summary.iqr_only += 1,
                (false, false) => summary.neither += 1,
            }
            summary.severity.add(score.severity);
            summary
                .by_group
                .entry(record.group)
                .or_default()
                .add(score.severity);
        }

        summary
    }

    /// Records on which the two tests disagree
    pub fn disagreements(&self) -> usize {
        self.z_only + self.iqr_only
    }
}
