//! Contracts for the external collaborators the monitoring core consumes:
//! printer protocol adapters, raw network probing and auxiliary discovery
//! sources.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::{Credential, DeviceInfo, DiscoveredDevice, SupplyReading};

/// Custom error type for protocol adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The device did not answer within the allotted time.
    #[error("Device {0} timed out")]
    Timeout(IpAddr),

    /// The device answered but the response could not be interpreted.
    #[error("Protocol error from {address}: {message}")]
    Protocol {
        /// The device that produced the malformed response.
        address: IpAddr,
        /// Description of the failure.
        message: String,
    },

    /// The transport below the protocol failed.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// A capability-set interface over the wire protocols printers speak
/// (SNMP/IPP/HTTP/PJL). One variant implementation exists per protocol;
/// the discovery and orchestration core depends only on this interface.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Checks whether the protocol endpoint answers at all.
    async fn probe_available(&self, address: IpAddr, credential: &Credential) -> bool;

    /// Retrieves identity data (vendor/model/serial) from the device.
    async fn get_device_info(
        &self,
        address: IpAddr,
        credential: &Credential,
    ) -> Result<Option<DeviceInfo>, AdapterError>;

    /// Retrieves current supply levels from the device.
    async fn get_supply_levels(
        &self,
        address: IpAddr,
        credential: &Credential,
    ) -> Result<Vec<SupplyReading>, AdapterError>;
}

/// Raw network reachability operations used by the discovery engine.
///
/// Implementations must honor the supplied timeout; the engine layers its own
/// cancellation on top.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkProber: Send + Sync {
    /// Sends an ICMP echo request and reports whether a reply arrived within
    /// the timeout.
    async fn ping(&self, address: IpAddr, timeout: Duration) -> bool;

    /// Attempts a TCP connection to the port and reports whether it was
    /// accepted within the timeout.
    async fn probe_port(&self, address: IpAddr, port: u16, timeout: Duration) -> bool;

    /// Resolves the address to a hostname, best effort.
    async fn reverse_lookup(&self, address: IpAddr) -> Option<String>;
}

/// A directory service (e.g. LDAP) that knows about registered printers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectoryDiscovery: Send + Sync {
    /// Queries the directory for registered printer devices.
    async fn query(&self) -> Result<Vec<DiscoveredDevice>, AdapterError>;
}

/// A management-instrumentation source (e.g. WMI) that reports installed
/// printers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManagementInstrumentationDiscovery: Send + Sync {
    /// Queries the instrumentation source for installed printer devices.
    async fn query(&self) -> Result<Vec<DiscoveredDevice>, AdapterError>;
}
