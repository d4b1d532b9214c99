use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::deserialize_duration_from_seconds;

fn default_ewma_alpha() -> f64 {
    0.3
}

fn default_minimum_data_points() -> usize {
    5
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_forecast_interval() -> Duration {
    Duration::from_secs(21_600)
}

/// Parameters for the depletion forecast model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSettings {
    /// Smoothing factor for the exponentially weighted moving average.
    #[serde(default = "default_ewma_alpha")]
    pub ewma_alpha: f64,

    /// Minimum number of historical snapshots required to produce a forecast.
    #[serde(default = "default_minimum_data_points")]
    pub minimum_data_points: usize,

    /// Confidence level for the forecast band (0.80, 0.90, 0.95 or 0.99).
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,

    /// How often the orchestrator recomputes forecasts, in seconds.
    #[serde(
        default = "default_forecast_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub interval: Duration,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            ewma_alpha: default_ewma_alpha(),
            minimum_data_points: default_minimum_data_points(),
            confidence_level: default_confidence_level(),
            interval: default_forecast_interval(),
        }
    }
}
