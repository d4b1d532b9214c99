use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_scan_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_max_concurrent_scans() -> usize {
    50
}

fn default_scan_retries() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_true() -> bool {
    true
}

fn default_discovery_interval() -> Duration {
    Duration::from_secs(3600)
}

/// Settings for a network discovery run.
///
/// The range string accepts comma-separated CIDR blocks (`192.168.1.0/24`),
/// dash ranges (`192.168.1.10-50` or `192.168.1.10-192.168.1.50`) and single
/// addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// The IP range specification to scan.
    pub ip_range: String,

    /// Timeout for a single address probe, in milliseconds.
    #[serde(
        default = "default_scan_timeout",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub scan_timeout: Duration,

    /// Maximum number of addresses probed concurrently.
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,

    /// Number of additional probe attempts per address after the first.
    #[serde(default = "default_scan_retries")]
    pub scan_retries: u32,

    /// Delay between probe attempts, in milliseconds.
    #[serde(
        default = "default_retry_delay",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub retry_delay: Duration,

    /// Whether to enhance discovered devices with SNMP identity data.
    #[serde(default = "default_true")]
    pub enable_snmp_fingerprint: bool,

    /// Whether to skip recently-responsive addresses on repeat scans.
    #[serde(default)]
    pub enable_incremental: bool,

    /// How often the orchestrator triggers a discovery run, in seconds.
    #[serde(
        default = "default_discovery_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub interval: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            ip_range: String::new(),
            scan_timeout: default_scan_timeout(),
            max_concurrent_scans: default_max_concurrent_scans(),
            scan_retries: default_scan_retries(),
            retry_delay: default_retry_delay(),
            enable_snmp_fingerprint: true,
            enable_incremental: false,
            interval: default_discovery_interval(),
        }
    }
}
