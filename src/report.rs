//! Human-readable text report (default output format)

use crate::pipeline::AnalysisReport;
use crate::record::MovementRecord;
use crate::severity::Severity;
use crate::validation::InconsistencyReport;
use std::fmt;

/// Maximum number of flagged records listed individually
const TOP_FLAGGED: usize = 10;

/// Data-quality section on its own (used by --validate-only)
pub struct DataQualitySection<'a>(pub &'a InconsistencyReport);

impl fmt::Display for DataQualitySection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "=== Data Quality ===")?;
        writeln!(f, "Records:                 {}", report.total_records)?;
        writeln!(f, "Missing quantity:        {}", report.missing_quantity)?;
        writeln!(f, "Missing owner:           {}", report.missing_owner)?;
        writeln!(f, "Operation/sign mismatch: {}", report.sign_mismatch)?;
        if report.is_clean() {
            return writeln!(f, "✅ No inconsistencies found");
        }
        let indices: Vec<String> = report
            .offending_indices()
            .iter()
            .map(|i| i.to_string())
            .collect();
        writeln!(
            f,
            "⚠️  {} record(s) with issues: {}",
            indices.len(),
            indices.join(", ")
        )
    }
}

/// Full analysis report
pub struct TextReport<'a> {
    report: &'a AnalysisReport,
    records: &'a [MovementRecord],
}

impl<'a> TextReport<'a> {
    pub fn new(report: &'a AnalysisReport, records: &'a [MovementRecord]) -> Self {
        Self { report, records }
    }

    fn fmt_overview(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = &self.report.profile;
        writeln!(f, "=== Stock Movement Anomaly Report ===")?;
        writeln!(f, "Total records: {}", profile.total_records)?;
        if let Some(period) = profile.period {
            writeln!(
                f,
                "Period: {} to {}",
                period.start.format("%d/%m/%Y"),
                period.end.format("%d/%m/%Y")
            )?;
        }
        for (title, counts) in [
            ("Units", &profile.by_unit),
            ("Materials", &profile.by_material),
            ("Operations", &profile.by_operation),
        ] {
            writeln!(f, "{}:", title)?;
            for c in counts.iter().filter(|c| c.count > 0) {
                writeln!(f, "  {}: {} ({:.1}%)", c.label, c.count, c.share_pct)?;
            }
        }
        Ok(())
    }

    fn fmt_detection(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detection = &self.report.detection;
        writeln!(f, "=== Outlier Detection ===")?;
        writeln!(f, "Classified records:      {}", detection.classified)?;
        writeln!(f, "Insufficient baseline:   {}", detection.insufficient_baseline)?;
        writeln!(f, "Flagged by both tests:   {}", detection.both)?;
        writeln!(f, "Flagged by Z-score only: {}", detection.z_only)?;
        writeln!(f, "Flagged by IQR only:     {}", detection.iqr_only)?;
        writeln!(f, "Severity Distribution:")?;
        for severity in Severity::ALL.iter().rev() {
            writeln!(
                f,
                "  {:<10} {}",
                severity.as_str(),
                detection.severity.get(*severity)
            )?;
        }

        let flagged = self.report.flagged();
        if flagged.is_empty() {
            return Ok(());
        }
        writeln!(f, "Top Flagged Records:")?;
        for (i, entry) in flagged.iter().take(TOP_FLAGGED).enumerate() {
            let (Some(score), Some(record)) = (&entry.score, self.records.get(entry.index)) else {
                continue;
            };
            let baseline = self.report.baselines.get(&entry.group);
            writeln!(
                f,
                "  {}. [{}] #{} {} {} {} - z={:.2}{}{} (baseline: {:.1} ± {:.1})",
                i + 1,
                score.severity,
                entry.index,
                record.date,
                entry.group,
                score.magnitude,
                score.z_score,
                if score.z_flag { " Z" } else { "" },
                if score.iqr_flag { " IQR" } else { "" },
                baseline.map_or(0.0, |b| b.mean),
                baseline.map_or(0.0, |b| b.std_dev),
            )?;
        }
        if flagged.len() > TOP_FLAGGED {
            writeln!(f, "  ... and {} more", flagged.len() - TOP_FLAGGED)?;
        }
        Ok(())
    }

    fn fmt_impact(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let impact = &self.report.impact;
        writeln!(f, "=== Financial Impact ===")?;
        writeln!(f, "Total value moved:       R$ {:.2}", impact.total_value)?;
        writeln!(f, "Estimated impact:        R$ {:.2}", impact.total_impact)?;
        writeln!(f, "Impact share:            {:.2}%", impact.impact_pct)?;
        writeln!(f, "By failure type:")?;
        for estimate in &impact.categories {
            writeln!(f, "  {}: R$ {:.2}", estimate.category, estimate.amount)?;
        }
        if !impact.by_material.is_empty() {
            writeln!(f, "By material:")?;
            for (material, amount) in &impact.by_material {
                writeln!(f, "  {}: R$ {:.2}", material, amount)?;
            }
        }
        if !impact.by_unit.is_empty() {
            writeln!(f, "By unit:")?;
            for (unit, amount) in &impact.by_unit {
                writeln!(f, "  {}: R$ {:.2}", unit, amount)?;
            }
        }
        let indirect = &impact.indirect;
        if indirect.total_indirect > 0.0 {
            writeln!(f, "Indirect costs:          R$ {:.2}", indirect.total_indirect)?;
            writeln!(
                f,
                "Impact incl. indirect:   R$ {:.2} ({:.2}%)",
                indirect.total_with_indirect, indirect.pct_with_indirect
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_overview(f)?;
        writeln!(f)?;
        write!(f, "{}", DataQualitySection(&self.report.inconsistencies))?;
        writeln!(f)?;
        self.fmt_detection(f)?;
        writeln!(f)?;
        self.fmt_impact(f)
    }
}

/// Render the data-quality section on its own
pub fn inconsistency_report_string(report: &InconsistencyReport) -> String {
    DataQualitySection(report).to_string()
}

/// Render the full analysis report
pub fn to_report_string(report: &AnalysisReport, records: &[MovementRecord]) -> String {
    TextReport::new(report, records).to_string()
}
