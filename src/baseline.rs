//! Per-group baseline statistics
//!
//! Records are grouped by (material, unit) and each group is summarised over
//! quantity magnitudes (|quantity|): mean, sample standard deviation and the
//! quartiles used by the IQR fences. Groups are independent, so they are
//! estimated in parallel over read-only slices and collected into an ordered
//! map; the result never depends on scheduling or hash iteration order.
//!
//! Means and quartiles are computed in f64 on the raw magnitudes (R-7 linear
//! interpolation for quartiles). The variance goes through trueno::Vector on
//! mean-centred deviations.

use crate::record::{serialize_by_group, GroupKey, MovementRecord};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use trueno::Vector;

/// Statistical summary of one (material, unit) group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBaseline {
    pub key: GroupKey,
    /// Records with a quantity
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); zero for single-record groups
    pub std_dev: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl GroupBaseline {
    /// Summarise the quantity magnitudes of one group
    ///
    /// Returns an error for an empty slice; a single value yields a
    /// degenerate baseline.
    pub fn from_magnitudes(key: GroupKey, magnitudes: &[f64]) -> Result<Self> {
        if magnitudes.is_empty() {
            anyhow::bail!("group {} has no valid quantities", key);
        }

        let mut sorted = magnitudes.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let (min, max) = (sorted[0], sorted[n - 1]);

        // Identical values: no spread, whatever the rounding of the mean
        if min == max {
            return Ok(Self {
                key,
                count: n,
                mean: min,
                std_dev: 0.0,
                q1: min,
                q3: min,
                iqr: 0.0,
            });
        }

        let mean = sorted.iter().sum::<f64>() / n as f64;

        // Deviations are centred in f64 first, so the f32 SIMD pass only has
        // to resolve the spread, not the magnitude of the quantities
        let deviations: Vec<f32> = magnitudes.iter().map(|&m| (m - mean) as f32).collect();
        let v = Vector::from_slice(&deviations);
        let population_variance = v
            .variance()
            .context("failed to compute group variance")?;
        let sample_variance = f64::from(population_variance) * n as f64 / (n - 1) as f64;
        let std_dev = sample_variance.max(0.0).sqrt();

        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);

        Ok(Self {
            key,
            count: n,
            mean,
            std_dev,
            q1,
            q3,
            iqr: (q3 - q1).max(0.0),
        })
    }

    /// Too little data (or no spread) for meaningful outlier tests
    pub fn is_degenerate(&self) -> bool {
        self.count < 2 || !(self.std_dev > 0.0) || !self.std_dev.is_finite()
    }

    /// Tukey fence `(Q1 - k*IQR, Q3 + k*IQR)`
    pub fn fence(&self, multiplier: f64) -> (f64, f64) {
        (
            self.q1 - multiplier * self.iqr,
            self.q3 + multiplier * self.iqr,
        )
    }

    /// Whether `magnitude` falls strictly outside the fence for `multiplier`
    pub fn outside_fence(&self, magnitude: f64, multiplier: f64) -> bool {
        let (low, high) = self.fence(multiplier);
        magnitude < low || magnitude > high
    }
}

/// R-7 quantile of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let (a, b) = (sorted[lo], sorted[hi]);
    if a == b {
        a
    } else {
        a + (h - lo as f64) * (b - a)
    }
}

/// Baselines for every group present in a record set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baselines(BTreeMap<GroupKey, GroupBaseline>);

impl Serialize for Baselines {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_by_group(&self.0, serializer)
    }
}

impl Baselines {
    pub fn get(&self, key: &GroupKey) -> Option<&GroupBaseline> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupBaseline> {
        self.0.values()
    }

    /// Groups whose baseline cannot support outlier tests
    pub fn degenerate_groups(&self) -> Vec<GroupKey> {
        self.iter()
            .filter(|b| b.is_degenerate())
            .map(|b| b.key)
            .collect()
    }
}

/// Group quantity magnitudes by (material, unit), skipping missing quantities
pub fn group_magnitudes(records: &[MovementRecord]) -> BTreeMap<GroupKey, Vec<f64>> {
    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(magnitude) = record.magnitude() {
            groups.entry(record.group()).or_default().push(magnitude);
        }
    }
    groups
}

/// Estimate baselines for every group with at least one valid quantity
pub fn estimate_baselines(records: &[MovementRecord]) -> Baselines {
    let groups: Vec<(GroupKey, Vec<f64>)> = group_magnitudes(records).into_iter().collect();

    let estimated: Vec<GroupBaseline> = groups
        .par_iter()
        .filter_map(|(key, magnitudes)| {
            match GroupBaseline::from_magnitudes(*key, magnitudes) {
                Ok(baseline) => Some(baseline),
                Err(e) => {
                    tracing::warn!("Failed to estimate baseline for {}: {}", key, e);
                    None
                }
            }
        })
        .collect();

    let baselines = Baselines(estimated.into_iter().map(|b| (b.key, b)).collect());
    tracing::debug!(
        groups = baselines.len(),
        degenerate = baselines.degenerate_groups().len(),
        "estimated group baselines"
    );
    baselines
}
