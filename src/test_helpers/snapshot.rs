use chrono::{DateTime, Utc};

use crate::models::{ForecastSnapshot, SupplyKind, FORECAST_MODEL_EWMA};

/// Builder for [`ForecastSnapshot`] fixtures.
pub struct SnapshotBuilder {
    snapshot: ForecastSnapshot,
}

impl SnapshotBuilder {
    /// Creates a builder for a snapshot at 100% with a 1%/day usage rate.
    pub fn new(device_id: &str, kind: SupplyKind) -> Self {
        Self {
            snapshot: ForecastSnapshot {
                device_id: device_id.to_string(),
                supply_kind: kind,
                current_percent: 100.0,
                days_left: 100,
                lower_bound: 100,
                upper_bound: 100,
                confidence: 1.0,
                daily_usage: 1.0,
                usage_variance: 0.0,
                model: FORECAST_MODEL_EWMA.to_string(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Sets the supply level at snapshot time.
    pub fn percent(mut self, percent: f64) -> Self {
        self.snapshot.current_percent = percent;
        self
    }

    /// Sets the recorded daily usage.
    pub fn daily_usage(mut self, usage: f64) -> Self {
        self.snapshot.daily_usage = usage;
        self
    }

    /// Sets the snapshot timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.snapshot.timestamp = timestamp;
        self
    }

    /// Builds the snapshot.
    pub fn build(self) -> ForecastSnapshot {
        self.snapshot
    }
}
