//! Analysis configuration
//!
//! Every threshold, rate and price used by the pipeline lives here and is
//! passed explicitly into each run, so several analyses with different
//! assumptions can execute side by side. Defaults reproduce the reference
//! hospital study (3σ Z-score, 1.5×IQR Tukey fences, 10% missing and 5%
//! duplicate estimation rates, R$ unit prices).
//!
//! A configuration is validated once, before any record is processed;
//! validation failures are the only fatal errors of an analysis run.

use crate::record::Material;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by malformed configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("severity cut points must be strictly increasing (watch < alert < critical), got {watch} / {alert} / {critical}")]
    NonMonotonicSeverity { watch: f64, alert: f64, critical: f64 },

    #[error("IQR multipliers must satisfy 0 <= watch < outlier < critical, got {watch} / {outlier} / {critical}")]
    IqrMultipliersOutOfOrder { watch: f64, outlier: f64, critical: f64 },

    #[error("{name} must be within [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("unit price for {material} must be a non-negative finite number, got {price}")]
    InvalidPrice { material: Material, price: f64 },

    #[error("indirect cost '{name}' must be a non-negative finite number, got {value}")]
    InvalidIndirectCost { name: &'static str, value: f64 },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Severity cut points
///
/// `watch`, `alert` and `critical` apply to |z|. `iqr_watch` and
/// `iqr_critical` are IQR multipliers for the inner (Attention) and outer
/// (Critical) fences around the outlier fence set by
/// [`AnalysisConfig::iqr_multiplier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub watch: f64,
    pub alert: f64,
    pub critical: f64,
    pub iqr_watch: f64,
    pub iqr_critical: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            watch: 2.0,
            alert: 3.0,
            critical: 4.0,
            iqr_watch: 1.0,
            iqr_critical: 3.0,
        }
    }
}

/// Fixed indirect costs added on top of the direct impact estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndirectCosts {
    /// Labour spent correcting records
    pub correction_labor: f64,
    /// Procedures delayed by missing material
    pub procedure_delays: f64,
    /// Emergency purchases at premium prices
    pub emergency_purchases: f64,
}

impl Default for IndirectCosts {
    fn default() -> Self {
        Self {
            correction_labor: 3_500.0,
            procedure_delays: 12_000.0,
            emergency_purchases: 6_500.0,
        }
    }
}

impl IndirectCosts {
    pub fn total(&self) -> f64 {
        self.correction_labor + self.procedure_delays + self.emergency_purchases
    }

    /// No indirect costs at all
    pub fn none() -> Self {
        Self {
            correction_labor: 0.0,
            procedure_delays: 0.0,
            emergency_purchases: 0.0,
        }
    }
}

/// Unit price per material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(BTreeMap<Material, f64>);

impl Default for PriceTable {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Material::Seringa, 2.5),       // per unit
            (Material::Medicamentos, 45.0), // per unit
            (Material::Tubo, 15.0),         // per unit
            (Material::Esparadrapo, 8.0),   // per roll
            (Material::Gaze, 3.5),          // per pack
        ]))
    }
}

impl PriceTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_price(mut self, material: Material, price: f64) -> Self {
        self.0.insert(material, price);
        self
    }

    pub fn get(&self, material: Material) -> Option<f64> {
        self.0.get(&material).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Material, f64)> + '_ {
        self.0.iter().map(|(m, p)| (*m, *p))
    }
}

impl FromIterator<(Material, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (Material, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Configuration for a single analysis run
///
/// # Example
/// ```
/// use stockaudit::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.z_threshold, 3.0);
/// assert_eq!(config.iqr_multiplier, 1.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// |z| above which the Z-score test flags a record
    pub z_threshold: f64,

    /// Tukey fence multiplier for the IQR test
    pub iqr_multiplier: f64,

    /// Share of flagged records per group assumed to hide a missing record
    pub missing_rate: f64,

    /// Share of each flagged record's value attributed to duplication
    pub duplicate_rate: f64,

    pub severity: SeverityThresholds,

    pub prices: PriceTable,

    pub indirect_costs: IndirectCosts,

    /// Bound the incorrect-record factor to [0, 1], evaluated on |z|.
    /// Off by default, which applies `(z - 1) / z` on the signed Z-score.
    pub clamp_incorrect_factor: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            z_threshold: 3.0,
            iqr_multiplier: 1.5,
            missing_rate: 0.10,
            duplicate_rate: 0.05,
            severity: SeverityThresholds::default(),
            prices: PriceTable::default(),
            indirect_costs: IndirectCosts::default(),
            clamp_incorrect_factor: false,
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load and validate a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive("z_threshold", self.z_threshold)?;
        positive("iqr_multiplier", self.iqr_multiplier)?;

        let s = &self.severity;
        positive("severity.watch", s.watch)?;
        positive("severity.alert", s.alert)?;
        positive("severity.critical", s.critical)?;
        if !(s.watch < s.alert && s.alert < s.critical) {
            return Err(ConfigError::NonMonotonicSeverity {
                watch: s.watch,
                alert: s.alert,
                critical: s.critical,
            });
        }

        let fences_ordered = s.iqr_watch.is_finite()
            && s.iqr_critical.is_finite()
            && s.iqr_watch >= 0.0
            && s.iqr_watch < self.iqr_multiplier
            && self.iqr_multiplier < s.iqr_critical;
        if !fences_ordered {
            return Err(ConfigError::IqrMultipliersOutOfOrder {
                watch: s.iqr_watch,
                outlier: self.iqr_multiplier,
                critical: s.iqr_critical,
            });
        }

        rate("missing_rate", self.missing_rate)?;
        rate("duplicate_rate", self.duplicate_rate)?;

        // Materials without a price are allowed and simply left unvalued
        for (material, price) in self.prices.iter() {
            if !price.is_finite() || price < 0.0 {
                return Err(ConfigError::InvalidPrice { material, price });
            }
        }

        let costs = &self.indirect_costs;
        for (name, value) in [
            ("correction_labor", costs.correction_labor),
            ("procedure_delays", costs.procedure_delays),
            ("emergency_purchases", costs.emergency_purchases),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidIndirectCost { name, value });
            }
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn rate(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange { name, value })
    }
}
