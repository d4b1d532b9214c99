//! Device models: scan targets, discovered devices and the monitored roster.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// An address queued for probing. Ephemeral, produced by range expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    /// The address to probe.
    pub address: Ipv4Addr,
}

/// How a device was discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Found by probing an IP range.
    SubnetScan,
    /// Reported by a directory service.
    Directory,
    /// Reported by management instrumentation.
    ManagementInstrumentation,
}

/// The estimated type of a discovered device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// A single-function printer.
    Printer,
    /// A multi-function device (print/scan/copy).
    MultiFunctionDevice,
    /// Could not be classified.
    Unknown,
}

/// A candidate device produced by a discovery run.
///
/// Records from different sources are merged by address, keeping the
/// highest-confidence entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredDevice {
    /// The network address the device responded on.
    pub address: IpAddr,
    /// Reverse-DNS hostname, if resolution succeeded.
    pub hostname: Option<String>,
    /// Vendor name, if identified.
    pub vendor: Option<String>,
    /// Model name, if identified.
    pub model: Option<String>,
    /// Serial number, if identified.
    pub serial: Option<String>,
    /// How this record was produced.
    pub method: DiscoveryMethod,
    /// TCP ports that accepted a connection during probing.
    pub open_ports: BTreeSet<u16>,
    /// The estimated device type.
    pub device_type: DeviceType,
    /// Heuristic 0-1 estimate of how likely this is a printer.
    pub confidence: f64,
}

impl DiscoveredDevice {
    /// Creates a record for a device reported by an external source with a
    /// fixed confidence.
    pub fn from_source(address: IpAddr, method: DiscoveryMethod, confidence: f64) -> Self {
        Self {
            address,
            hostname: None,
            vendor: None,
            model: None,
            serial: None,
            method,
            open_ports: BTreeSet::new(),
            device_type: DeviceType::Printer,
            confidence,
        }
    }

    /// Raises the confidence score, capped at 1.0.
    pub fn boost_confidence(&mut self, amount: f64) {
        self.confidence = (self.confidence + amount).min(1.0);
    }
}

/// Credentials used by protocol adapters to query a device.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Credential {
    /// SNMP community string.
    pub community: Option<String>,
    /// Username for authenticated protocols.
    pub username: Option<String>,
    /// Password for authenticated protocols.
    pub password: Option<String>,
}

/// Identity data returned by a protocol adapter for a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Vendor name.
    pub vendor: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Serial number.
    pub serial: Option<String>,
}

/// A device on the monitored roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoredDevice {
    /// Stable identifier for the device.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Network address the device is polled on.
    pub address: IpAddr,
    /// Physical location, if known.
    pub location: Option<String>,
    /// Site the device belongs to, used for rule and recipient scoping.
    pub site: Option<String>,
    /// Credentials for polling the device.
    #[serde(default)]
    pub credential: Credential,
}
