//! Severity tiers for classified records
//!
//! Each test contributes its own tier and the record gets the highest one:
//!
//! | Signal                               | Tier      |
//! |--------------------------------------|-----------|
//! | \|z\| >= `critical`                  | Critical  |
//! | \|z\| >= `alert`                     | Alert     |
//! | \|z\| >= `watch`                     | Attention |
//! | beyond the `iqr_critical` fence      | Critical  |
//! | beyond the outlier fence (IQR flag)  | Alert     |
//! | beyond the `iqr_watch` fence         | Attention |
//!
//! A record flagged by exactly one test is at least Alert; flagged by both
//! it is Critical. Values sitting exactly on a |z| cut point take the higher
//! tier.

use crate::anomaly::IqrBand;
use crate::config::SeverityThresholds;
use serde::Serialize;
use std::fmt;

/// Ordered severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Normal,
    Attention,
    Alert,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Normal,
        Severity::Attention,
        Severity::Alert,
        Severity::Critical,
    ];

    /// Alert and Critical records feed the financial impact estimate
    pub fn is_flagged(self) -> bool {
        self >= Severity::Alert
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Attention => "Attention",
            Severity::Alert => "Alert",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier from Z-score magnitude alone
pub fn z_tier(z_score: f64, thresholds: &SeverityThresholds) -> Severity {
    let abs_z = z_score.abs();
    if abs_z >= thresholds.critical {
        Severity::Critical
    } else if abs_z >= thresholds.alert {
        Severity::Alert
    } else if abs_z >= thresholds.watch {
        Severity::Attention
    } else {
        Severity::Normal
    }
}

/// Tier from the position relative to the IQR fences alone
pub fn iqr_tier(band: IqrBand) -> Severity {
    match band {
        IqrBand::Inside => Severity::Normal,
        IqrBand::Watch => Severity::Attention,
        IqrBand::Outlier => Severity::Alert,
        IqrBand::Far => Severity::Critical,
    }
}

/// Combine both signals into a single tier
pub fn rank(
    z_score: f64,
    z_flag: bool,
    band: IqrBand,
    thresholds: &SeverityThresholds,
) -> Severity {
    let iqr_flag = band >= IqrBand::Outlier;
    let tier = z_tier(z_score, thresholds).max(iqr_tier(band));

    match (z_flag, iqr_flag) {
        (true, true) => Severity::Critical,
        (true, false) | (false, true) => tier.max(Severity::Alert),
        (false, false) => tier,
    }
}
