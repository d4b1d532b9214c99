//! # Discovery Engine
//!
//! Turns an IP-range specification into a deduplicated, confidence-scored
//! list of candidate printer devices.
//!
//! ## Workflow
//!
//! 1. The range specification is expanded into a concrete address set; bad
//!    input fails here, before any packet is sent.
//! 2. Addresses are probed in fixed-size batches, fanned out under a
//!    semaphore capped at `max_concurrent_scans`. Each probe pings with an
//!    adaptive timeout, resolves the hostname best-effort and sweeps a fixed
//!    port list.
//! 3. Responsive hosts are classified by port/hostname heuristics; only
//!    printer-like devices are kept, each with a confidence score.
//! 4. Directory and management-instrumentation sources run independently;
//!    all sources are merged by address, keeping the highest-confidence
//!    record.
//! 5. Devices exposing SNMP are optionally enhanced with vendor/model/serial
//!    data from the protocol adapter.
//! 6. The final list is cached for 30 minutes under an exact signature of the
//!    request, and responsive addresses feed the incremental-scan memory.

pub mod cache;
pub mod classify;
pub mod probe;
pub mod range;

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use cache::{ScanCache, ScanSignature};
use probe::ProbeOutcome;

use crate::config::DiscoverySettings;
use crate::models::{Credential, DeviceType, DiscoveredDevice, DiscoveryMethod, ScanTarget};
use crate::providers::{
    DirectoryDiscovery, ManagementInstrumentationDiscovery, NetworkProber, ProtocolAdapter,
};

/// Addresses are probed in batches of this size to bound memory on large
/// ranges.
const BATCH_SIZE: usize = 1000;

/// Confidence assigned to devices reported by the directory service.
const DIRECTORY_CONFIDENCE: f64 = 0.8;

/// Confidence assigned to devices reported by management instrumentation.
const INSTRUMENTATION_CONFIDENCE: f64 = 0.7;

/// Confidence boost for devices identified via SNMP fingerprinting.
const FINGERPRINT_BOOST: f64 = 0.3;

/// SNMP port; fingerprinting only applies to devices that exposed it.
const PORT_SNMP: u16 = 161;

/// Errors that can occur during a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The range specification could not be parsed.
    #[error("Invalid IP range: {0}")]
    InvalidRange(String),

    /// The run was cancelled before completing.
    #[error("Discovery cancelled")]
    Cancelled,
}

/// The discovery engine. See the module documentation for the workflow.
pub struct DiscoveryEngine {
    prober: Arc<dyn NetworkProber>,
    adapter: Option<Arc<dyn ProtocolAdapter>>,
    directory: Option<Arc<dyn DirectoryDiscovery>>,
    instrumentation: Option<Arc<dyn ManagementInstrumentationDiscovery>>,
    cache: ScanCache,
}

impl DiscoveryEngine {
    /// Creates an engine that probes through `prober`.
    pub fn new(prober: Arc<dyn NetworkProber>) -> Self {
        Self {
            prober,
            adapter: None,
            directory: None,
            instrumentation: None,
            cache: ScanCache::new(),
        }
    }

    /// Attaches a protocol adapter used for SNMP fingerprint enhancement.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Attaches a directory discovery source.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryDiscovery>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Attaches a management-instrumentation discovery source.
    pub fn with_instrumentation(
        mut self,
        instrumentation: Arc<dyn ManagementInstrumentationDiscovery>,
    ) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    /// Runs discovery for the range in `settings`.
    ///
    /// Identical requests within the cache TTL return the cached result
    /// without scanning. Per-address failures are treated as "no response";
    /// auxiliary source failures are logged and ignored. Cancellation aborts
    /// outstanding probes without side effects.
    pub async fn discover(
        &self,
        settings: &DiscoverySettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let all_addresses = range::expand_range(&settings.ip_range)?;
        let signature = ScanSignature::new(&all_addresses, settings);
        let now = Utc::now();

        if let Some(cached) = self.cache.get(&signature, now) {
            tracing::debug!(
                range = %settings.ip_range,
                devices = cached.len(),
                "Returning cached discovery result."
            );
            return Ok(cached);
        }

        let range_key = signature.range_key();
        let skip = if settings.enable_incremental {
            self.cache.incremental_skip_set(&range_key, now)
        } else {
            None
        };
        let full_scan = skip.is_none();

        let targets: Vec<ScanTarget> = match &skip {
            Some(skip) => all_addresses
                .difference(skip)
                .map(|&address| ScanTarget { address })
                .collect(),
            None => all_addresses
                .iter()
                .map(|&address| ScanTarget { address })
                .collect(),
        };

        tracing::info!(
            range = %settings.ip_range,
            targets = targets.len(),
            skipped = all_addresses.len() - targets.len(),
            "Starting discovery scan."
        );

        let outcomes = self.scan_targets(&targets, settings, cancel).await?;
        let responsive: Vec<Ipv4Addr> = outcomes.iter().map(|o| o.address).collect();

        let mut merged: HashMap<IpAddr, DiscoveredDevice> = HashMap::new();
        for outcome in outcomes {
            if let Some(device) = device_from_outcome(outcome) {
                merge_device(&mut merged, device);
            }
        }

        for device in self.query_directory().await {
            merge_device(&mut merged, device);
        }
        for device in self.query_instrumentation().await {
            merge_device(&mut merged, device);
        }

        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        let mut devices: Vec<DiscoveredDevice> = merged.into_values().collect();
        devices.sort_by_key(|d| d.address);

        if settings.enable_snmp_fingerprint {
            self.enhance_with_fingerprint(&mut devices).await;
        }

        self.cache.record_scan(range_key, &responsive, full_scan, now);
        self.cache.insert(signature, devices.clone(), now);

        tracing::info!(devices = devices.len(), "Discovery scan complete.");
        Ok(devices)
    }

    /// Probes all targets, batched and bounded by the concurrency limit.
    async fn scan_targets(
        &self,
        targets: &[ScanTarget],
        settings: &DiscoverySettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProbeOutcome>, DiscoveryError> {
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent_scans.max(1)));
        let mut outcomes = Vec::new();

        for batch in targets.chunks(BATCH_SIZE) {
            let mut join_set = tokio::task::JoinSet::new();

            for &target in batch {
                let semaphore = Arc::clone(&semaphore);
                let prober = Arc::clone(&self.prober);
                let settings = settings.clone();
                let cancel = cancel.clone();

                join_set.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return None,
                    };
                    probe::probe_address(prober, target, &settings, &cancel).await
                });
            }

            while let Some(result) = join_set.join_next().await {
                match result {
                    Ok(Some(outcome)) => outcomes.push(outcome),
                    Ok(None) => {}
                    Err(e) => {
                        // A panicked probe counts as "no response" for that
                        // address.
                        tracing::warn!(error = %e, "Probe task failed.");
                    }
                }
            }

            if cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
        }

        Ok(outcomes)
    }

    async fn query_directory(&self) -> Vec<DiscoveredDevice> {
        let Some(directory) = &self.directory else {
            return Vec::new();
        };

        match directory.query().await {
            Ok(devices) => devices
                .into_iter()
                .map(|mut device| {
                    device.method = DiscoveryMethod::Directory;
                    device.confidence = DIRECTORY_CONFIDENCE;
                    device
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Directory discovery failed; continuing without it.");
                Vec::new()
            }
        }
    }

    async fn query_instrumentation(&self) -> Vec<DiscoveredDevice> {
        let Some(instrumentation) = &self.instrumentation else {
            return Vec::new();
        };

        match instrumentation.query().await {
            Ok(devices) => devices
                .into_iter()
                .map(|mut device| {
                    device.method = DiscoveryMethod::ManagementInstrumentation;
                    device.confidence = INSTRUMENTATION_CONFIDENCE;
                    device
                })
                .collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Management-instrumentation discovery failed; continuing without it."
                );
                Vec::new()
            }
        }
    }

    /// Queries SNMP identity data for devices that exposed port 161 and
    /// raises their confidence.
    async fn enhance_with_fingerprint(&self, devices: &mut [DiscoveredDevice]) {
        let Some(adapter) = &self.adapter else {
            return;
        };
        let credential = Credential::default();

        for device in devices.iter_mut() {
            if !device.open_ports.contains(&PORT_SNMP) {
                continue;
            }

            match adapter.get_device_info(device.address, &credential).await {
                Ok(Some(info)) => {
                    device.vendor = info.vendor.or(device.vendor.take());
                    device.model = info.model.or(device.model.take());
                    device.serial = info.serial.or(device.serial.take());
                    device.boost_confidence(FINGERPRINT_BOOST);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        address = %device.address,
                        error = %e,
                        "SNMP fingerprint failed for device."
                    );
                }
            }
        }
    }
}

/// Builds a device record from a probe outcome; hosts that do not classify
/// as printer-like are dropped.
fn device_from_outcome(outcome: ProbeOutcome) -> Option<DiscoveredDevice> {
    let device_type = classify::classify(&outcome.open_ports, outcome.hostname.as_deref());
    if device_type == DeviceType::Unknown {
        tracing::trace!(address = %outcome.address, "Responsive host is not printer-like.");
        return None;
    }

    let confidence = classify::confidence(&outcome.open_ports, outcome.hostname.as_deref());
    Some(DiscoveredDevice {
        address: IpAddr::V4(outcome.address),
        hostname: outcome.hostname,
        vendor: None,
        model: None,
        serial: None,
        method: DiscoveryMethod::SubnetScan,
        open_ports: outcome.open_ports,
        device_type,
        confidence,
    })
}

/// Merges a device into the address-keyed map, keeping the
/// highest-confidence record per address.
fn merge_device(merged: &mut HashMap<IpAddr, DiscoveredDevice>, device: DiscoveredDevice) {
    match merged.get_mut(&device.address) {
        Some(existing) if existing.confidence >= device.confidence => {}
        Some(existing) => *existing = device,
        None => {
            merged.insert(device.address, device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_device(addr: [u8; 4], confidence: f64) -> DiscoveredDevice {
        DiscoveredDevice::from_source(
            IpAddr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])),
            DiscoveryMethod::SubnetScan,
            confidence,
        )
    }

    #[test]
    fn merge_keeps_highest_confidence_per_address() {
        let mut merged = HashMap::new();
        merge_device(&mut merged, scan_device([10, 0, 0, 1], 0.5));

        let mut directory = scan_device([10, 0, 0, 1], 0.8);
        directory.method = DiscoveryMethod::Directory;
        merge_device(&mut merged, directory);

        let kept = &merged[&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))];
        assert_eq!(kept.confidence, 0.8);
        assert_eq!(kept.method, DiscoveryMethod::Directory);
    }

    #[test]
    fn merge_ignores_lower_confidence_duplicate() {
        let mut merged = HashMap::new();
        merge_device(&mut merged, scan_device([10, 0, 0, 1], 0.8));
        merge_device(&mut merged, scan_device([10, 0, 0, 1], 0.3));

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))].confidence,
            0.8
        );
    }

    #[test]
    fn unknown_hosts_are_dropped() {
        let outcome = ProbeOutcome {
            address: Ipv4Addr::new(10, 0, 0, 9),
            hostname: Some("fileserver".into()),
            open_ports: [22u16].into(),
        };
        assert!(device_from_outcome(outcome).is_none());
    }

    #[test]
    fn printer_outcome_becomes_device() {
        let outcome = ProbeOutcome {
            address: Ipv4Addr::new(10, 0, 0, 7),
            hostname: Some("hp-laserjet".into()),
            open_ports: [9100u16, 161].into(),
        };
        let device = device_from_outcome(outcome).unwrap();
        assert_eq!(device.device_type, DeviceType::Printer);
        assert_eq!(device.method, DiscoveryMethod::SubnetScan);
        // 0.4 (9100) + 0.2 (161) + 0.2 (vendor token)
        assert!((device.confidence - 0.8).abs() < 1e-9);
    }
}
