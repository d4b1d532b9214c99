//! Integration tests for the forecast engine over an in-memory snapshot
//! history.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use printwatch::config::ForecastSettings;
use printwatch::forecast::ForecastEngine;
use printwatch::models::SupplyKind;
use printwatch::test_helpers::{InMemoryRepository, SnapshotBuilder};

fn settings() -> ForecastSettings {
    ForecastSettings {
        ewma_alpha: 0.3,
        minimum_data_points: 5,
        confidence_level: 0.95,
        ..Default::default()
    }
}

fn seed_steady_decline(
    repository: &InMemoryRepository,
    device: &str,
    kind: SupplyKind,
    start: f64,
    rate: f64,
    count: usize,
) {
    let begin = Utc::now() - ChronoDuration::days(count as i64);
    let snapshots = (0..count)
        .map(|i| {
            SnapshotBuilder::new(device, kind)
                .percent(start - rate * i as f64)
                .daily_usage(rate)
                .at(begin + ChronoDuration::days(i as i64))
                .build()
        })
        .collect();
    repository.seed_snapshots(snapshots);
}

#[tokio::test]
async fn steady_decline_forecasts_days_left_deterministically() {
    let repository = Arc::new(InMemoryRepository::new());
    seed_steady_decline(&repository, "dev-1", SupplyKind::Black, 80.0, 2.0, 10);
    let engine = ForecastEngine::new(Arc::clone(&repository));

    let snapshot = engine
        .forecast("dev-1", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap()
        .unwrap();

    assert!((snapshot.daily_usage - 2.0).abs() < 1e-9);
    assert_eq!(snapshot.days_left, 30);
    assert!((snapshot.confidence - 1.0).abs() < 1e-9);
    assert_eq!(snapshot.model, "ewma-v1");
}

#[tokio::test]
async fn successful_forecast_is_appended_to_the_history() {
    let repository = Arc::new(InMemoryRepository::new());
    seed_steady_decline(&repository, "dev-1", SupplyKind::Black, 80.0, 2.0, 10);
    let engine = ForecastEngine::new(Arc::clone(&repository));

    engine
        .forecast("dev-1", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap()
        .unwrap();

    let history = repository.snapshots_for("dev-1", SupplyKind::Black);
    assert_eq!(history.len(), 11);

    // The appended snapshot now feeds the next forecast.
    let again = engine
        .forecast("dev-1", SupplyKind::Black, 58.0, &settings())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(repository.snapshots_for("dev-1", SupplyKind::Black).len(), 12);
    assert!(again.daily_usage > 0.0);
}

#[tokio::test]
async fn insufficient_history_yields_no_forecast() {
    let repository = Arc::new(InMemoryRepository::new());
    seed_steady_decline(&repository, "dev-1", SupplyKind::Black, 80.0, 2.0, 4);
    let engine = ForecastEngine::new(Arc::clone(&repository));

    let result = engine
        .forecast("dev-1", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap();

    assert!(result.is_none());
    // Nothing was appended either.
    assert_eq!(repository.snapshots_for("dev-1", SupplyKind::Black).len(), 4);
}

#[tokio::test]
async fn device_and_supply_histories_are_isolated() {
    let repository = Arc::new(InMemoryRepository::new());
    seed_steady_decline(&repository, "dev-1", SupplyKind::Black, 80.0, 2.0, 10);
    seed_steady_decline(&repository, "dev-1", SupplyKind::Drum, 90.0, 0.5, 10);
    let engine = ForecastEngine::new(Arc::clone(&repository));

    let black = engine
        .forecast("dev-1", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap()
        .unwrap();
    let drum = engine
        .forecast("dev-1", SupplyKind::Drum, 60.0, &settings())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(black.days_left, 30);
    assert_eq!(drum.days_left, 120);

    // An unseen device still has no forecast.
    assert!(engine
        .forecast("dev-2", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn variance_produces_a_symmetric_band_with_z_1_96() {
    let repository = Arc::new(InMemoryRepository::new());
    let begin = Utc::now() - ChronoDuration::days(10);
    // Steady 2%/day decline, but recorded daily_usage alternates 1 and 3 so
    // the history has a known spread around the smoothed mean of 2.
    let snapshots = (0..10)
        .map(|i| {
            SnapshotBuilder::new("dev-1", SupplyKind::Black)
                .percent(80.0 - 2.0 * i as f64)
                .daily_usage(if i % 2 == 0 { 1.0 } else { 3.0 })
                .at(begin + ChronoDuration::days(i as i64))
                .build()
        })
        .collect();
    repository.seed_snapshots(snapshots);
    let engine = ForecastEngine::new(Arc::clone(&repository));

    let snapshot = engine
        .forecast("dev-1", SupplyKind::Black, 60.0, &settings())
        .await
        .unwrap()
        .unwrap();

    // Sample variance of five 1s and five 3s around mean 2 is 10/9.
    assert!((snapshot.usage_variance - 10.0 / 9.0).abs() < 1e-9);

    let margin = snapshot.usage_variance.sqrt() * 1.96;
    let expected_lower = ((snapshot.days_left as f64) - margin).floor() as i64;
    let expected_upper = ((snapshot.days_left as f64) + margin).ceil() as i64;
    assert_eq!(snapshot.lower_bound, expected_lower.max(0));
    assert_eq!(snapshot.upper_bound, expected_upper);
}
