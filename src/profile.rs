//! Exploratory profile of a record set: period covered and how records are
//! distributed over units, materials and operations.

use crate::record::{Material, MovementRecord, Operation, Unit};
use chrono::NaiveDate;
use serde::Serialize;

/// Number of records in one category and its share of the total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    /// Percent of all records (0-100)
    pub share_pct: f64,
}

/// First and last movement date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub total_records: usize,
    pub period: Option<Period>,
    pub by_unit: Vec<CategoryCount>,
    pub by_material: Vec<CategoryCount>,
    pub by_operation: Vec<CategoryCount>,
}

impl DatasetProfile {
    pub fn from_records(records: &[MovementRecord]) -> Self {
        let total = records.len();

        let period = records.iter().map(|r| r.date).fold(None::<Period>, |acc, date| {
            Some(match acc {
                None => Period {
                    start: date,
                    end: date,
                },
                Some(p) => Period {
                    start: p.start.min(date),
                    end: p.end.max(date),
                },
            })
        });

        Self {
            total_records: total,
            period,
            by_unit: count_by(records, &Unit::ALL, |r| r.unit, Unit::as_str),
            by_material: count_by(records, &Material::ALL, |r| r.material, Material::as_str),
            by_operation: count_by(records, &Operation::ALL, |r| r.operation, Operation::as_str),
        }
    }
}

fn count_by<K: Copy + PartialEq>(
    records: &[MovementRecord],
    keys: &[K],
    key_of: impl Fn(&MovementRecord) -> K,
    label: impl Fn(K) -> &'static str,
) -> Vec<CategoryCount> {
    let total = records.len();
    keys.iter()
        .map(|&key| {
            let count = records.iter().filter(|r| key_of(r) == key).count();
            let share_pct = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            CategoryCount {
                label: label(key).to_string(),
                count,
                share_pct,
            }
        })
        .collect()
}
