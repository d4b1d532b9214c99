//! Hand-rolled test doubles for the external contracts, usable from
//! integration tests where the generated mocks are not.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::dispatch::{ChannelSender, SendError};
use crate::models::{
    AlertCategory, AlertSeverity, DiscoveredDevice, ForecastSnapshot, SupplyKind, SupplyReading,
};
use crate::persistence::{DeviceRepository, HistoryLog, PersistenceError};
use crate::providers::NetworkProber;

/// A channel sender that records every call and can fail the first N
/// attempts.
#[derive(Default)]
pub struct RecordingSender {
    calls: Mutex<Vec<(String, String, String)>>,
    fail_remaining: AtomicU32,
}

impl RecordingSender {
    /// Creates a sender that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sender whose first `failures` sends fail with a 500.
    pub fn failing(failures: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_remaining: AtomicU32::new(failures),
        }
    }

    /// All calls seen so far, as (address, subject, body).
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of send attempts seen so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SendError> {
        self.calls.lock().unwrap().push((
            address.to_string(),
            subject.to_string(),
            body.to_string(),
        ));

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SendError::Status(500));
        }
        Ok(())
    }
}

/// One recorded history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The device the entry belongs to.
    pub device_id: String,
    /// The entry title.
    pub title: String,
    /// The severity recorded.
    pub severity: AlertSeverity,
    /// The category recorded.
    pub category: AlertCategory,
}

/// A history log that records entries in memory.
#[derive(Default)]
pub struct RecordingHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl RecordingHistory {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries appended so far.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryLog for RecordingHistory {
    async fn append(
        &self,
        device_id: &str,
        title: &str,
        _message: &str,
        severity: AlertSeverity,
        category: AlertCategory,
    ) -> Result<(), PersistenceError> {
        self.entries.lock().unwrap().push(HistoryEntry {
            device_id: device_id.to_string(),
            title: title.to_string(),
            severity,
            category,
        });
        Ok(())
    }
}

/// A host the [`FakeProber`] answers for.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    /// Hostname returned by reverse lookup.
    pub hostname: Option<String>,
    /// Ports that accept connections.
    pub open_ports: Vec<u16>,
}

/// A network prober backed by a static host table.
#[derive(Default)]
pub struct FakeProber {
    hosts: HashMap<IpAddr, FakeHost>,
    ping_count: AtomicUsize,
}

impl FakeProber {
    /// Creates a prober with no responsive hosts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a responsive host.
    pub fn host(mut self, address: IpAddr, fake: FakeHost) -> Self {
        self.hosts.insert(address, fake);
        self
    }

    /// Number of pings issued so far, across all addresses.
    pub fn ping_count(&self) -> usize {
        self.ping_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProber for FakeProber {
    async fn ping(&self, address: IpAddr, _timeout: Duration) -> bool {
        self.ping_count.fetch_add(1, Ordering::SeqCst);
        self.hosts.contains_key(&address)
    }

    async fn probe_port(&self, address: IpAddr, port: u16, _timeout: Duration) -> bool {
        self.hosts
            .get(&address)
            .map(|host| host.open_ports.contains(&port))
            .unwrap_or(false)
    }

    async fn reverse_lookup(&self, address: IpAddr) -> Option<String> {
        self.hosts.get(&address).and_then(|host| host.hostname.clone())
    }
}

/// An in-memory device repository for pipeline tests.
#[derive(Default)]
pub struct InMemoryRepository {
    devices: Mutex<Vec<DiscoveredDevice>>,
    readings: Mutex<Vec<(String, Vec<SupplyReading>)>>,
    snapshots: Mutex<HashMap<(String, SupplyKind), Vec<ForecastSnapshot>>>,
}

impl InMemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads snapshot history for a device/supply pair.
    pub fn seed_snapshots(&self, snapshots: Vec<ForecastSnapshot>) {
        let mut store = self.snapshots.lock().unwrap();
        for snapshot in snapshots {
            store
                .entry((snapshot.device_id.clone(), snapshot.supply_kind))
                .or_default()
                .push(snapshot);
        }
    }

    /// All devices saved so far.
    pub fn saved_devices(&self) -> Vec<DiscoveredDevice> {
        self.devices.lock().unwrap().clone()
    }

    /// All reading batches saved so far.
    pub fn saved_readings(&self) -> Vec<(String, Vec<SupplyReading>)> {
        self.readings.lock().unwrap().clone()
    }

    /// Snapshot history for a device/supply pair, oldest first.
    pub fn snapshots_for(&self, device_id: &str, kind: SupplyKind) -> Vec<ForecastSnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&(device_id.to_string(), kind))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryRepository {
    async fn save_device(&self, device: &DiscoveredDevice) -> Result<(), PersistenceError> {
        self.devices.lock().unwrap().push(device.clone());
        Ok(())
    }

    async fn save_supply_readings(
        &self,
        device_id: &str,
        readings: &[SupplyReading],
    ) -> Result<(), PersistenceError> {
        self.readings
            .lock()
            .unwrap()
            .push((device_id.to_string(), readings.to_vec()));
        Ok(())
    }

    async fn save_forecast_snapshot(
        &self,
        snapshot: &ForecastSnapshot,
    ) -> Result<(), PersistenceError> {
        self.snapshots
            .lock()
            .unwrap()
            .entry((snapshot.device_id.clone(), snapshot.supply_kind))
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn load_forecast_history(
        &self,
        device_id: &str,
        kind: SupplyKind,
    ) -> Result<Vec<ForecastSnapshot>, PersistenceError> {
        let mut history = self
            .snapshots
            .lock()
            .unwrap()
            .get(&(device_id.to_string(), kind))
            .cloned()
            .unwrap_or_default();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }
}
