//! Supply kinds and readings reported by printer protocol adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of consumable a reading refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SupplyKind {
    /// Black toner or ink.
    Black,
    /// Cyan toner or ink.
    Cyan,
    /// Magenta toner or ink.
    Magenta,
    /// Yellow toner or ink.
    Yellow,
    /// Imaging drum unit.
    Drum,
    /// Fuser unit.
    Fuser,
    /// Waste toner container.
    Waste,
    /// Maintenance kit.
    Maintenance,
    /// Any consumable not covered by the variants above.
    Other,
}

impl std::fmt::Display for SupplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SupplyKind::Black => "black",
            SupplyKind::Cyan => "cyan",
            SupplyKind::Magenta => "magenta",
            SupplyKind::Yellow => "yellow",
            SupplyKind::Drum => "drum",
            SupplyKind::Fuser => "fuser",
            SupplyKind::Waste => "waste",
            SupplyKind::Maintenance => "maintenance",
            SupplyKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A single supply-level reading for one consumable on one device.
///
/// Produced by a protocol adapter; consumed, never mutated, by the alert and
/// forecast engines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplyReading {
    /// The consumable this reading refers to.
    pub kind: SupplyKind,
    /// Normalized fill level in percent (0-100), if the device reports one.
    pub percent: Option<f64>,
    /// Raw level value as reported by the device.
    pub level: Option<i64>,
    /// Raw maximum capacity as reported by the device.
    pub max: Option<i64>,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl SupplyReading {
    /// Creates a reading with a normalized percent level, stamped now.
    pub fn with_percent(kind: SupplyKind, percent: f64) -> Self {
        Self {
            kind,
            percent: Some(percent),
            level: None,
            max: None,
            timestamp: Utc::now(),
        }
    }
}
