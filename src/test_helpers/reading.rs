use chrono::{DateTime, Utc};

use crate::models::{SupplyKind, SupplyReading};

/// Builder for [`SupplyReading`] fixtures.
pub struct ReadingBuilder {
    reading: SupplyReading,
}

impl ReadingBuilder {
    /// Creates a builder for a reading of the given kind at 100%.
    pub fn new(kind: SupplyKind) -> Self {
        Self {
            reading: SupplyReading {
                kind,
                percent: Some(100.0),
                level: None,
                max: None,
                timestamp: Utc::now(),
            },
        }
    }

    /// Sets the normalized percent level.
    pub fn percent(mut self, percent: f64) -> Self {
        self.reading.percent = Some(percent);
        self
    }

    /// Clears the percent level, as devices without normalized reporting do.
    pub fn no_percent(mut self) -> Self {
        self.reading.percent = None;
        self
    }

    /// Sets the raw level and maximum.
    pub fn raw(mut self, level: i64, max: i64) -> Self {
        self.reading.level = Some(level);
        self.reading.max = Some(max);
        self
    }

    /// Sets the reading timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.reading.timestamp = timestamp;
        self
    }

    /// Builds the reading.
    pub fn build(self) -> SupplyReading {
        self.reading
    }
}
