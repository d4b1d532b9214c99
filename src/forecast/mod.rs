//! # Forecast Engine
//!
//! Estimates days until a supply depletes from the historical snapshot
//! series, using exponentially-weighted smoothing of observed consumption
//! rates with a confidence band.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::ForecastSettings;
use crate::models::{ForecastSnapshot, SupplyKind, FORECAST_MODEL_EWMA};
use crate::persistence::{DeviceRepository, PersistenceError};

/// Only this many of the most recent snapshots feed the rate estimate.
const MAX_RECENT_SNAPSHOTS: usize = 10;

/// Floor for the smoothed usage rate, in percent per day.
const MIN_DAILY_USAGE: f64 = 0.01;

/// Errors that can occur while computing a forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The snapshot history could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Computes depletion forecasts and appends them to the snapshot history.
pub struct ForecastEngine<R: DeviceRepository> {
    repository: Arc<R>,
}

impl<R: DeviceRepository> ForecastEngine<R> {
    /// Creates an engine over the snapshot repository.
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Produces a forecast for a device/supply pair, or `None` when fewer
    /// than `minimum_data_points` historical snapshots exist.
    ///
    /// Every successful forecast is appended as a new snapshot for future
    /// smoothing.
    pub async fn forecast(
        &self,
        device_id: &str,
        kind: SupplyKind,
        current_percent: f64,
        settings: &ForecastSettings,
    ) -> Result<Option<ForecastSnapshot>, ForecastError> {
        let history = self
            .repository
            .load_forecast_history(device_id, kind)
            .await?;

        if history.len() < settings.minimum_data_points {
            tracing::debug!(
                device = device_id,
                supply = %kind,
                points = history.len(),
                required = settings.minimum_data_points,
                "Not enough history for a forecast."
            );
            return Ok(None);
        }

        let snapshot = compute_forecast(device_id, kind, current_percent, &history, settings);
        self.repository.save_forecast_snapshot(&snapshot).await?;

        tracing::info!(
            device = device_id,
            supply = %kind,
            days_left = snapshot.days_left,
            confidence = snapshot.confidence,
            "Forecast computed."
        );
        Ok(Some(snapshot))
    }
}

/// Per-supply-kind heuristic consumption rate used when no valid consumption
/// transitions exist, in percent per day.
fn fallback_rate(kind: SupplyKind) -> f64 {
    match kind {
        SupplyKind::Black => 2.5,
        SupplyKind::Cyan | SupplyKind::Magenta | SupplyKind::Yellow => 1.0,
        SupplyKind::Drum => 0.5,
        SupplyKind::Fuser => 0.3,
        _ => 1.0,
    }
}

/// Z multiplier for the supported confidence levels.
fn z_score(confidence_level: f64) -> f64 {
    const LEVELS: [(f64, f64); 4] = [(0.80, 1.282), (0.90, 1.645), (0.95, 1.96), (0.99, 2.576)];
    LEVELS
        .iter()
        .find(|(level, _)| (confidence_level - level).abs() < 1e-9)
        .map(|(_, z)| *z)
        .unwrap_or(1.0)
}

/// The pure forecast computation over an in-memory history.
fn compute_forecast(
    device_id: &str,
    kind: SupplyKind,
    current_percent: f64,
    history: &[ForecastSnapshot],
    settings: &ForecastSettings,
) -> ForecastSnapshot {
    // Most recent first, capped, then flipped chronological for smoothing.
    let mut recent: Vec<&ForecastSnapshot> = history.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(MAX_RECENT_SNAPSHOTS);
    recent.reverse();

    // Percent-per-24h rates from decreasing transitions only; refills are
    // not consumption.
    let mut rates = Vec::new();
    for pair in recent.windows(2) {
        let (older, newer) = (pair[0], pair[1]);
        if older.current_percent <= newer.current_percent {
            continue;
        }
        let hours = newer
            .timestamp
            .signed_duration_since(older.timestamp)
            .num_minutes() as f64
            / 60.0;
        if hours <= 0.0 {
            continue;
        }
        rates.push((older.current_percent - newer.current_percent) / hours * 24.0);
    }

    if rates.is_empty() {
        rates.push(fallback_rate(kind));
    }

    let mut ewma = rates[0];
    for rate in &rates[1..] {
        ewma = settings.ewma_alpha * rate + (1.0 - settings.ewma_alpha) * ewma;
    }
    let daily_usage = ewma.max(MIN_DAILY_USAGE);

    let days_left = (current_percent / daily_usage).floor() as i64;

    let data_points = history.len() as f64;
    let confidence = (0.5
        + 0.5 * (data_points / settings.minimum_data_points.max(1) as f64).min(1.0))
    .min(1.0);

    // Sample variance (n-1) of the recent snapshots' daily-usage values
    // around the smoothed mean.
    let usage_variance = if recent.len() >= 2 {
        recent
            .iter()
            .map(|s| (s.daily_usage - daily_usage).powi(2))
            .sum::<f64>()
            / (recent.len() - 1) as f64
    } else {
        0.0
    };

    let margin = usage_variance.sqrt() * z_score(settings.confidence_level);
    let lower_bound = ((days_left as f64 - margin).floor() as i64).max(0);
    let upper_bound = (days_left as f64 + margin).ceil() as i64;

    ForecastSnapshot {
        device_id: device_id.to_string(),
        supply_kind: kind,
        current_percent,
        days_left,
        lower_bound,
        upper_bound,
        confidence,
        daily_usage,
        usage_variance,
        model: FORECAST_MODEL_EWMA.to_string(),
        timestamp: Utc::now(),
    }
}
