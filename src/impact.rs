//! Financial impact of record-quality failures
//!
//! Flagged records (Alert or Critical) are priced at `|quantity| × unit
//! price` and fed to three independent estimators:
//!
//! 1. Incorrect records: each flagged value scaled by `(z - 1) / z`, the
//!    share of the recorded value attributed to the deviation. With
//!    `clamp_incorrect_factor` the factor is taken on |z| and bounded to
//!    [0, 1]; otherwise it is negative for 0 < z < 1 and above one for z < 0.
//! 2. Missing records: per group, `missing_rate × flagged count × mean
//!    record value`.
//! 3. Duplicate records: `duplicate_rate × value` per flagged record.
//!
//! The estimators model different failure modes over the same flagged set,
//! so they overlap and are summed as-is without deduplication.

use crate::anomaly::ClassifiedRecord;
use crate::config::{AnalysisConfig, IndirectCosts};
use crate::record::{serialize_by_group, GroupKey, Material, MovementRecord, Unit};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Failure mode behind an impact estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ImpactCategory {
    IncorrectRecord,
    MissingRecord,
    DuplicateRecord,
}

impl ImpactCategory {
    pub const ALL: [ImpactCategory; 3] = [
        ImpactCategory::IncorrectRecord,
        ImpactCategory::MissingRecord,
        ImpactCategory::DuplicateRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImpactCategory::IncorrectRecord => "Incorrect records",
            ImpactCategory::MissingRecord => "Missing records",
            ImpactCategory::DuplicateRecord => "Duplicate records",
        }
    }
}

impl fmt::Display for ImpactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactEstimate {
    pub category: ImpactCategory,
    pub amount: f64,
}

/// Missing-record estimate for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMissingImpact {
    pub flagged: usize,
    pub mean_value: f64,
    /// `missing_rate × flagged`
    pub estimated_missing: f64,
    pub amount: f64,
}

/// Direct impact plus fixed indirect costs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndirectImpact {
    pub costs: IndirectCosts,
    pub total_indirect: f64,
    pub total_with_indirect: f64,
    pub pct_with_indirect: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    /// Value of every priced record, flagged or not
    pub total_value: f64,
    pub flagged_records: usize,
    /// One entry per category, in [`ImpactCategory::ALL`] order
    pub categories: Vec<ImpactEstimate>,
    pub total_impact: f64,
    /// `total_impact / total_value × 100`
    pub impact_pct: f64,
    /// Incorrect-record impact per material
    pub by_material: BTreeMap<Material, f64>,
    /// Incorrect-record impact per unit
    pub by_unit: BTreeMap<Unit, f64>,
    #[serde(serialize_with = "serialize_by_group")]
    pub missing_by_group: BTreeMap<GroupKey, GroupMissingImpact>,
    pub indirect: IndirectImpact,
}

impl ImpactReport {
    pub fn amount(&self, category: ImpactCategory) -> f64 {
        self.categories
            .iter()
            .find(|e| e.category == category)
            .map_or(0.0, |e| e.amount)
    }
}

/// Monetary value of a record; `None` without quantity or price
pub fn record_value(record: &MovementRecord, config: &AnalysisConfig) -> Option<f64> {
    let magnitude = record.magnitude()?;
    let price = config.prices.get(record.material)?;
    Some(magnitude * price)
}

/// Share of a flagged value attributed to the deviation, `(z - 1) / z`
///
/// A zero Z-score contributes nothing. When `clamp` is set the factor is
/// evaluated on |z| and bounded to [0, 1].
pub fn incorrect_fraction(z_score: f64, clamp: bool) -> f64 {
    if z_score == 0.0 || !z_score.is_finite() {
        return 0.0;
    }
    if clamp {
        let z = z_score.abs();
        ((z - 1.0) / z).clamp(0.0, 1.0)
    } else {
        (z_score - 1.0) / z_score
    }
}

#[derive(Default)]
struct GroupAccumulator {
    value_sum: f64,
    valued: usize,
    flagged: usize,
}

/// Estimate the financial impact of the flagged records
///
/// `classified` must come from classifying `records`; entries are matched
/// back to their records by index.
pub fn estimate_impact(
    records: &[MovementRecord],
    classified: &[ClassifiedRecord],
    config: &AnalysisConfig,
) -> ImpactReport {
    let mut total_value = 0.0;
    let mut groups: BTreeMap<GroupKey, GroupAccumulator> = BTreeMap::new();

    for record in records {
        let group = groups.entry(record.group()).or_default();
        match record_value(record, config) {
            Some(value) => {
                total_value += value;
                group.value_sum += value;
                group.valued += 1;
            }
            None if record.quantity.is_some() => {
                tracing::warn!("No unit price for {}, record left unvalued", record.material);
            }
            None => {}
        }
    }

    let mut incorrect = 0.0;
    let mut duplicate = 0.0;
    let mut flagged_records = 0;
    let mut by_material: BTreeMap<Material, f64> = BTreeMap::new();
    let mut by_unit: BTreeMap<Unit, f64> = BTreeMap::new();

    for entry in classified.iter().filter(|c| c.is_flagged()) {
        let (Some(record), Some(score)) = (records.get(entry.index), entry.score.as_ref()) else {
            continue;
        };
        flagged_records += 1;
        groups.entry(entry.group).or_default().flagged += 1;

        let Some(value) = record_value(record, config) else {
            continue;
        };

        let incorrect_amount =
            value * incorrect_fraction(score.z_score, config.clamp_incorrect_factor);
        incorrect += incorrect_amount;
        *by_material.entry(record.material).or_default() += incorrect_amount;
        *by_unit.entry(record.unit).or_default() += incorrect_amount;

        duplicate += value * config.duplicate_rate;
    }

    let mut missing = 0.0;
    let mut missing_by_group = BTreeMap::new();
    for (key, group) in &groups {
        if group.flagged == 0 || group.valued == 0 {
            continue;
        }
        let mean_value = group.value_sum / group.valued as f64;
        let estimated_missing = group.flagged as f64 * config.missing_rate;
        let amount = estimated_missing * mean_value;
        missing += amount;
        missing_by_group.insert(
            *key,
            GroupMissingImpact {
                flagged: group.flagged,
                mean_value,
                estimated_missing,
                amount,
            },
        );
    }

    let categories = vec![
        ImpactEstimate {
            category: ImpactCategory::IncorrectRecord,
            amount: incorrect,
        },
        ImpactEstimate {
            category: ImpactCategory::MissingRecord,
            amount: missing,
        },
        ImpactEstimate {
            category: ImpactCategory::DuplicateRecord,
            amount: duplicate,
        },
    ];
    let total_impact = incorrect + missing + duplicate;
    let impact_pct = percent_of(total_impact, total_value);

    let total_indirect = config.indirect_costs.total();
    let total_with_indirect = total_impact + total_indirect;
    let indirect = IndirectImpact {
        costs: config.indirect_costs.clone(),
        total_indirect,
        total_with_indirect,
        pct_with_indirect: percent_of(total_with_indirect, total_value),
    };

    tracing::debug!(
        flagged_records,
        total_value,
        total_impact,
        "estimated financial impact"
    );

    ImpactReport {
        total_value,
        flagged_records,
        categories,
        total_impact,
        impact_pct,
        by_material,
        by_unit,
        missing_by_group,
        indirect,
    }
}

fn percent_of(amount: f64, total: f64) -> f64 {
    if total > 0.0 {
        amount / total * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyScore, IqrBand};
    use crate::config::PriceTable;
    use crate::record::Operation;
    use crate::severity::Severity;
    use chrono::NaiveDate;

    fn record(material: Material, unit: Unit, quantity: Option<f64>) -> MovementRecord {
        MovementRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            unit,
            material,
            operation: Operation::Outflow,
            quantity,
            owner: Some("Ana".to_string()),
        }
    }

    fn scored(index: usize, record: &MovementRecord, z_score: f64, severity: Severity) -> ClassifiedRecord {
        ClassifiedRecord {
            index,
            group: record.group(),
            score: Some(AnomalyScore {
                magnitude: record.magnitude().unwrap(),
                z_score,
                z_flag: z_score.abs() > 3.0,
                iqr_flag: severity.is_flagged(),
                iqr_band: if severity.is_flagged() {
                    IqrBand::Outlier
                } else {
                    IqrBand::Inside
                },
                pct_variation: None,
                severity,
            }),
            unclassified: None,
        }
    }

    fn seringa_only_config() -> AnalysisConfig {
        AnalysisConfig {
            prices: PriceTable::new().with_price(Material::Seringa, 2.5),
            indirect_costs: IndirectCosts::none(),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_incorrect_impact_reference_case() {
        let records = vec![record(Material::Seringa, Unit::Moema, Some(-100.0))];
        let classified = vec![scored(0, &records[0], 4.0, Severity::Critical)];
        let report = estimate_impact(&records, &classified, &seringa_only_config());

        assert_eq!(report.amount(ImpactCategory::IncorrectRecord), 187.5);
        assert_eq!(report.by_material[&Material::Seringa], 187.5);
        assert_eq!(report.by_unit[&Unit::Moema], 187.5);
        // 10% of one flagged record at the group mean value 250
        assert!((report.amount(ImpactCategory::MissingRecord) - 25.0).abs() < 1e-9);
        assert!((report.amount(ImpactCategory::DuplicateRecord) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_total_is_sum_of_categories() {
        let records = vec![
            record(Material::Seringa, Unit::Moema, Some(-10.0)),
            record(Material::Seringa, Unit::Moema, Some(-12.0)),
            record(Material::Seringa, Unit::Moema, Some(-500.0)),
            record(Material::Gaze, Unit::Morumbi, Some(-8.0)),
            record(Material::Gaze, Unit::Morumbi, Some(-90.0)),
        ];
        let classified = vec![
            scored(0, &records[0], -0.6, Severity::Normal),
            scored(1, &records[1], -0.5, Severity::Normal),
            scored(2, &records[2], 1.15, Severity::Alert),
            scored(3, &records[3], -0.7, Severity::Normal),
            scored(4, &records[4], 3.5, Severity::Critical),
        ];
        let report = estimate_impact(&records, &classified, &AnalysisConfig::default());

        let sum: f64 = report.categories.iter().map(|c| c.amount).sum();
        assert!((report.total_impact - sum).abs() < 1e-9);
        assert_eq!(report.flagged_records, 2);
        // Seringa 522 × 2.5 + Gaze 98 × 3.5
        assert!((report.total_value - 1648.0).abs() < 1e-9);
        assert!((report.impact_pct - report.total_impact / 1648.0 * 100.0).abs() < 1e-9);
        assert!(report.impact_pct >= 0.0 && report.impact_pct <= 100.0);
        assert_eq!(report.missing_by_group.len(), 2);
    }

    #[test]
    fn test_only_flagged_records_contribute() {
        let records = vec![
            record(Material::Tubo, Unit::SantoAmaro, Some(-5.0)),
            record(Material::Tubo, Unit::SantoAmaro, Some(-6.0)),
        ];
        let classified = vec![
            scored(0, &records[0], 2.5, Severity::Attention),
            scored(1, &records[1], 0.1, Severity::Normal),
        ];
        let config = AnalysisConfig {
            indirect_costs: IndirectCosts::none(),
            ..AnalysisConfig::default()
        };
        let report = estimate_impact(&records, &classified, &config);
        assert_eq!(report.total_impact, 0.0);
        assert_eq!(report.flagged_records, 0);
        assert!(report.by_material.is_empty());
        assert!((report.total_value - 165.0).abs() < 1e-9);
    }

    #[test]
    fn test_incorrect_fraction_signed() {
        assert_eq!(incorrect_fraction(0.0, false), 0.0);
        assert_eq!(incorrect_fraction(4.0, false), 0.75);
        assert_eq!(incorrect_fraction(0.5, false), -1.0);
        assert_eq!(incorrect_fraction(-2.0, false), 1.5);
        assert_eq!(incorrect_fraction(f64::NAN, false), 0.0);
    }

    #[test]
    fn test_incorrect_fraction_clamped() {
        assert_eq!(incorrect_fraction(0.0, true), 0.0);
        assert_eq!(incorrect_fraction(4.0, true), 0.75);
        assert_eq!(incorrect_fraction(0.5, true), 0.0);
        assert_eq!(incorrect_fraction(-2.0, true), 0.5);
        assert_eq!(incorrect_fraction(-4.0, true), incorrect_fraction(4.0, true));
    }

    #[test]
    fn test_negative_z_uses_signed_factor() {
        let records = vec![record(Material::Seringa, Unit::Moema, Some(-100.0))];
        let classified = vec![scored(0, &records[0], -2.0, Severity::Alert)];

        let report = estimate_impact(&records, &classified, &seringa_only_config());
        // 250 × (-2 - 1) / -2
        assert!((report.amount(ImpactCategory::IncorrectRecord) - 375.0).abs() < 1e-9);

        let clamped = AnalysisConfig {
            clamp_incorrect_factor: true,
            ..seringa_only_config()
        };
        let report = estimate_impact(&records, &classified, &clamped);
        assert!((report.amount(ImpactCategory::IncorrectRecord) - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_positive_z_lowers_incorrect_impact() {
        let records = vec![record(Material::Seringa, Unit::Moema, Some(-100.0))];
        let classified = vec![scored(0, &records[0], 0.5, Severity::Alert)];
        let report = estimate_impact(&records, &classified, &seringa_only_config());
        assert!((report.amount(ImpactCategory::IncorrectRecord) + 250.0).abs() < 1e-9);
        let sum: f64 = report.categories.iter().map(|c| c.amount).sum();
        assert!((report.total_impact - sum).abs() < 1e-9);
    }

    #[test]
    fn test_missing_quantity_records_are_unvalued() {
        let records = vec![
            record(Material::Seringa, Unit::Moema, Some(-100.0)),
            record(Material::Seringa, Unit::Moema, None),
        ];
        let classified = vec![scored(0, &records[0], 4.0, Severity::Critical)];
        let report = estimate_impact(&records, &classified, &seringa_only_config());
        assert_eq!(report.total_value, 250.0);
        assert_eq!(report.missing_by_group.values().next().unwrap().mean_value, 250.0);
    }

    #[test]
    fn test_configurable_rates() {
        let records = vec![record(Material::Seringa, Unit::Moema, Some(-100.0))];
        let classified = vec![scored(0, &records[0], 4.0, Severity::Alert)];
        let config = AnalysisConfig {
            missing_rate: 0.0,
            duplicate_rate: 0.2,
            ..seringa_only_config()
        };
        let report = estimate_impact(&records, &classified, &config);
        assert_eq!(report.amount(ImpactCategory::MissingRecord), 0.0);
        assert!((report.amount(ImpactCategory::DuplicateRecord) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_indirect_costs() {
        let records = vec![record(Material::Seringa, Unit::Moema, Some(-100.0))];
        let classified = vec![scored(0, &records[0], 4.0, Severity::Critical)];
        let config = AnalysisConfig {
            indirect_costs: IndirectCosts::default(),
            ..seringa_only_config()
        };
        let report = estimate_impact(&records, &classified, &config);
        assert_eq!(report.indirect.total_indirect, 22_000.0);
        assert!(
            (report.indirect.total_with_indirect - (report.total_impact + 22_000.0)).abs() < 1e-9
        );
    }

    #[test]
    fn test_empty_input() {
        let report = estimate_impact(&[], &[], &AnalysisConfig::default());
        assert_eq!(report.total_value, 0.0);
        assert_eq!(report.impact_pct, 0.0);
        assert_eq!(report.categories.len(), 3);
    }
}
