//! Stock movement records
//!
//! The schema mirrors the upstream export: one row per stock entry or exit,
//! keyed by hospital unit and material type. Quantities are signed (entries
//! positive, exits negative) and both quantity and owner may be missing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Hospital site that owns the stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "Morumbi")]
    Morumbi,
    #[serde(rename = "Santo Amaro")]
    SantoAmaro,
    #[serde(rename = "Moema")]
    Moema,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Morumbi, Unit::SantoAmaro, Unit::Moema];

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Morumbi => "Morumbi",
            Unit::SantoAmaro => "Santo Amaro",
            Unit::Moema => "Moema",
        }
    }
}

/// Supply type moved in or out of stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Material {
    Seringa,
    Gaze,
    Tubo,
    Medicamentos,
    Esparadrapo,
}

impl Material {
    pub const ALL: [Material; 5] = [
        Material::Seringa,
        Material::Gaze,
        Material::Tubo,
        Material::Medicamentos,
        Material::Esparadrapo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Material::Seringa => "Seringa",
            Material::Gaze => "Gaze",
            Material::Tubo => "Tubo",
            Material::Medicamentos => "Medicamentos",
            Material::Esparadrapo => "Esparadrapo",
        }
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Stock entry ("entrada"), expected to carry a non-negative quantity
    #[serde(rename = "entrada", alias = "inflow")]
    Inflow,
    /// Stock exit ("saida"), expected to carry a non-positive quantity
    #[serde(rename = "saida", alias = "outflow")]
    Outflow,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Inflow, Operation::Outflow];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Inflow => "entrada",
            Operation::Outflow => "saida",
        }
    }

    /// Whether `quantity` has the sign this operation requires
    pub fn accepts_sign(self, quantity: f64) -> bool {
        match self {
            Operation::Inflow => quantity >= 0.0,
            Operation::Outflow => quantity <= 0.0,
        }
    }
}

macro_rules! impl_display_and_parse {
    ($ty:ident, $what:literal, [$($alias:literal => $variant:expr),* $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if let Some(found) = $ty::ALL.iter().find(|v| v.as_str() == trimmed) {
                    return Ok(*found);
                }
                match trimmed {
                    $($alias => Ok($variant),)*
                    _ => Err(format!("unknown {}: '{}'", $what, trimmed)),
                }
            }
        }
    };
}

impl_display_and_parse!(Unit, "unit", []);
impl_display_and_parse!(Material, "material", []);
impl_display_and_parse!(Operation, "operation", [
    "inflow" => Operation::Inflow,
    "outflow" => Operation::Outflow,
    "saída" => Operation::Outflow,
]);

/// A single stock movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "unidade")]
    pub unit: Unit,
    pub material: Material,
    #[serde(rename = "tipo")]
    pub operation: Operation,
    #[serde(rename = "quantidade", default)]
    pub quantity: Option<f64>,
    #[serde(rename = "responsavel", default)]
    pub owner: Option<String>,
}

impl MovementRecord {
    /// Group this record belongs to for baseline statistics
    pub fn group(&self) -> GroupKey {
        GroupKey {
            material: self.material,
            unit: self.unit,
        }
    }

    /// Absolute quantity, if present
    pub fn magnitude(&self) -> Option<f64> {
        self.quantity.map(f64::abs)
    }
}

/// Baseline grouping key: (material, unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub material: Material,
    pub unit: Unit,
}

impl GroupKey {
    pub fn new(material: Material, unit: Unit) -> Self {
        Self { material, unit }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.material, self.unit)
    }
}

/// Serialize a group-keyed map with "material/unit" string keys
pub(crate) fn serialize_by_group<V, S>(
    map: &BTreeMap<GroupKey, V>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    serializer.collect_map(map.iter().map(|(key, value)| (key.to_string(), value)))
}
