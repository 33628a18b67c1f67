//! CSV output format for per-record scores
//!
//! One row per input record, in input order. Records that could not be
//! classified have empty score columns and a status explaining why.

use crate::anomaly::{ClassifiedRecord, Unclassified};
use crate::record::MovementRecord;

const HEADER: [&str; 13] = [
    "index",
    "data",
    "unidade",
    "material",
    "tipo",
    "quantidade",
    "responsavel",
    "z_score",
    "z_flag",
    "iqr_flag",
    "pct_variation",
    "severity",
    "status",
];

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(record: &MovementRecord, classified: &ClassifiedRecord) -> String {
    let mut fields = vec![
        classified.index.to_string(),
        record.date.to_string(),
        escape_field(record.unit.as_str()),
        escape_field(record.material.as_str()),
        record.operation.as_str().to_string(),
        record.quantity.map(|q| q.to_string()).unwrap_or_default(),
        escape_field(record.owner.as_deref().unwrap_or_default()),
    ];

    match (&classified.score, classified.unclassified) {
        (Some(score), _) => {
            fields.push(format!("{:.4}", score.z_score));
            fields.push(score.z_flag.to_string());
            fields.push(score.iqr_flag.to_string());
            fields.push(
                score
                    .pct_variation
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_default(),
            );
            fields.push(score.severity.to_string());
            fields.push("classified".to_string());
        }
        (None, reason) => {
            fields.extend(std::iter::repeat(String::new()).take(5));
            fields.push(
                match reason {
                    Some(Unclassified::MissingQuantity) => "missing_quantity",
                    Some(Unclassified::InsufficientBaseline) | None => "insufficient_baseline",
                }
                .to_string(),
            );
        }
    }

    fields.join(",")
}

/// Generate CSV output for classified records
pub fn scores_to_csv(records: &[MovementRecord], classified: &[ClassifiedRecord]) -> String {
    let mut output = HEADER.join(",");
    output.push('\n');

    for entry in classified {
        if let Some(record) = records.get(entry.index) {
            output.push_str(&format_row(record, entry));
            output.push('\n');
        }
    }

    output
}
