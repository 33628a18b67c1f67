//! Record consistency checks
//!
//! Purely diagnostic: nothing here drops or rewrites a record. The report
//! feeds human review, while the statistical stages decide for themselves
//! which records they can use (missing quantities are skipped, missing
//! owners are ignored).

use crate::record::{MovementRecord, Operation};
use serde::Serialize;

/// A data-quality problem found on one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    MissingQuantity,
    MissingOwner,
    /// Quantity sign contradicts the operation (negative entry, positive exit)
    SignMismatch { operation: Operation, quantity: f64 },
}

/// Issue attached to the index of the offending record in the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssue {
    pub index: usize,
    pub issue: DataQualityIssue,
}

/// Inconsistency report for a record set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InconsistencyReport {
    pub total_records: usize,
    pub missing_quantity: usize,
    pub missing_owner: usize,
    pub sign_mismatch: usize,
    pub issues: Vec<RecordIssue>,
}

impl InconsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Indices of records with at least one issue, ascending and unique
    pub fn offending_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.issues.iter().map(|i| i.index).collect();
        indices.dedup();
        indices
    }
}

/// Check every record and collect the issues found
pub fn validate_records(records: &[MovementRecord]) -> InconsistencyReport {
    let mut report = InconsistencyReport {
        total_records: records.len(),
        ..Default::default()
    };

    for (index, record) in records.iter().enumerate() {
        for issue in record_issues(record) {
            match issue {
                DataQualityIssue::MissingQuantity => report.missing_quantity += 1,
                DataQualityIssue::MissingOwner => report.missing_owner += 1,
                DataQualityIssue::SignMismatch { .. } => report.sign_mismatch += 1,
            }
            report.issues.push(RecordIssue { index, issue });
        }
    }

    if !report.is_clean() {
        tracing::debug!(
            missing_quantity = report.missing_quantity,
            missing_owner = report.missing_owner,
            sign_mismatch = report.sign_mismatch,
            "record validation found data-quality issues"
        );
    }

    report
}

fn record_issues(record: &MovementRecord) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();

    match record.quantity {
        None => issues.push(DataQualityIssue::MissingQuantity),
        Some(quantity) if !record.operation.accepts_sign(quantity) => {
            issues.push(DataQualityIssue::SignMismatch {
                operation: record.operation,
                quantity,
            });
        }
        Some(_) => {}
    }

    let owner_missing = record
        .owner
        .as_deref()
        .map_or(true, |owner| owner.trim().is_empty());
    if owner_missing {
        issues.push(DataQualityIssue::MissingOwner);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Material, Unit};
    use chrono::NaiveDate;

    fn record(operation: Operation, quantity: Option<f64>, owner: Option<&str>) -> MovementRecord {
        MovementRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            unit: Unit::Moema,
            material: Material::Seringa,
            operation,
            quantity,
            owner: owner.map(str::to_string),
        }
    }

    #[test]
    fn test_clean_records() {
        let records = vec![
            record(Operation::Inflow, Some(120.0), Some("Ana")),
            record(Operation::Outflow, Some(-4.0), Some("Bruno")),
            record(Operation::Outflow, Some(0.0), Some("Carla")),
        ];
        let report = validate_records(&records);
        assert!(report.is_clean());
        assert_eq!(report.total_records, 3);
    }

    #[test]
    fn test_sign_mismatches_both_directions() {
        let records = vec![
            record(Operation::Inflow, Some(-50.0), Some("Ana")),
            record(Operation::Outflow, Some(50.0), Some("Bruno")),
        ];
        let report = validate_records(&records);
        assert_eq!(report.sign_mismatch, 2);
        assert_eq!(
            report.issues[0].issue,
            DataQualityIssue::SignMismatch {
                operation: Operation::Inflow,
                quantity: -50.0
            }
        );
        assert_eq!(report.offending_indices(), vec![0, 1]);
    }

    #[test]
    fn test_missing_fields_are_counted() {
        let records = vec![
            record(Operation::Outflow, None, Some("Ana")),
            record(Operation::Outflow, Some(-3.0), None),
            record(Operation::Outflow, None, Some("  ")),
        ];
        let report = validate_records(&records);
        assert_eq!(report.missing_quantity, 2);
        assert_eq!(report.missing_owner, 2);
        assert_eq!(report.sign_mismatch, 0);
        assert_eq!(report.issues.len(), 4);
        assert_eq!(report.offending_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_quantity_is_not_a_sign_mismatch() {
        let report = validate_records(&[record(Operation::Inflow, None, Some("Ana"))]);
        assert_eq!(report.sign_mismatch, 0);
        assert_eq!(report.missing_quantity, 1);
    }
}
