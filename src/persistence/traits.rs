//! Contracts for the external persistence layer.
//!
//! The core treats storage as a save/load contract with idempotent,
//! at-least-once semantics; the relational schema behind it lives elsewhere.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::{
    AlertCategory, AlertSeverity, DiscoveredDevice, ForecastSnapshot, SupplyKind, SupplyReading,
};

/// Storage operations for devices, readings and forecast snapshots.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Persists a discovered device record.
    async fn save_device(&self, device: &DiscoveredDevice) -> Result<(), PersistenceError>;

    /// Persists a batch of supply readings for a device.
    async fn save_supply_readings(
        &self,
        device_id: &str,
        readings: &[SupplyReading],
    ) -> Result<(), PersistenceError>;

    /// Appends a forecast snapshot to a device/supply history.
    async fn save_forecast_snapshot(
        &self,
        snapshot: &ForecastSnapshot,
    ) -> Result<(), PersistenceError>;

    /// Loads historical forecast snapshots for a device/supply pair, most
    /// recent first.
    async fn load_forecast_history(
        &self,
        device_id: &str,
        kind: SupplyKind,
    ) -> Result<Vec<ForecastSnapshot>, PersistenceError>;
}

/// Append-only log of notification and alert history.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Appends one history entry.
    async fn append(
        &self,
        device_id: &str,
        title: &str,
        message: &str,
        severity: AlertSeverity,
        category: AlertCategory,
    ) -> Result<(), PersistenceError>;
}
