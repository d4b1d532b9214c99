//! Depletion forecast snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::supply::SupplyKind;

/// Identifier of the forecast model that produced a snapshot.
pub const FORECAST_MODEL_EWMA: &str = "ewma-v1";

/// A depletion forecast for one device/supply pair.
///
/// Snapshots double as the historical input series for later forecasts: each
/// records the supply level and smoothed usage rate at forecast time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastSnapshot {
    /// The device the forecast applies to.
    pub device_id: String,
    /// The supply kind the forecast applies to.
    pub supply_kind: SupplyKind,
    /// Supply level in percent at forecast time.
    pub current_percent: f64,
    /// Estimated days until depletion.
    pub days_left: i64,
    /// Lower bound of the confidence band, in days.
    pub lower_bound: i64,
    /// Upper bound of the confidence band, in days.
    pub upper_bound: i64,
    /// Confidence in the estimate (0-1), driven by data-point count.
    pub confidence: f64,
    /// Smoothed daily usage estimate, percent per day.
    pub daily_usage: f64,
    /// Sample variance of historical daily-usage values.
    pub usage_variance: f64,
    /// Identifier of the model that produced this snapshot.
    pub model: String,
    /// When the forecast was computed.
    pub timestamp: DateTime<Utc>,
}
