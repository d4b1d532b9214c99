//! Scan result caching and incremental-scan memory.

use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::DiscoverySettings;
use crate::models::DiscoveredDevice;

/// How long a completed scan result answers identical requests.
pub const RESULT_TTL: Duration = Duration::from_secs(30 * 60);

/// How long a responsive address is skipped by incremental scans, and how
/// recent a full scan must be for incremental mode to engage.
pub const INCREMENTAL_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Exact, order-independent signature of a scan request.
///
/// Built from the expanded (sorted) address set rather than the raw range
/// string, so `"10.0.0.1,10.0.0.2"` and `"10.0.0.2,10.0.0.1"` share one cache
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanSignature {
    addresses: Vec<Ipv4Addr>,
    timeout_ms: u64,
    concurrency: usize,
    retries: u32,
}

impl ScanSignature {
    /// Builds the signature for an expanded address set and scan settings.
    pub fn new(addresses: &BTreeSet<Ipv4Addr>, settings: &DiscoverySettings) -> Self {
        Self {
            addresses: addresses.iter().copied().collect(),
            timeout_ms: settings.scan_timeout.as_millis() as u64,
            concurrency: settings.max_concurrent_scans,
            retries: settings.scan_retries,
        }
    }

    /// The range-identity part of the signature, ignoring scan settings.
    /// Incremental memory is keyed by this.
    pub fn range_key(&self) -> Vec<Ipv4Addr> {
        self.addresses.clone()
    }
}

struct CachedResult {
    devices: Vec<DiscoveredDevice>,
    stored_at: DateTime<Utc>,
}

struct RecentScan {
    last_full_scan: DateTime<Utc>,
    responsive: HashMap<Ipv4Addr, DateTime<Utc>>,
}

/// Engine-owned cache of completed scans and recently-responsive addresses.
#[derive(Default)]
pub struct ScanCache {
    results: DashMap<ScanSignature, CachedResult>,
    recent: DashMap<Vec<Ipv4Addr>, RecentScan>,
}

impl ScanCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached device list for this signature if it is still
    /// fresh; evicts it otherwise.
    pub fn get(&self, signature: &ScanSignature, now: DateTime<Utc>) -> Option<Vec<DiscoveredDevice>> {
        let fresh = match self.results.get(signature) {
            Some(entry) => now.signed_duration_since(entry.stored_at).to_std().ok()?
                <= RESULT_TTL,
            None => return None,
        };

        if fresh {
            self.results.get(signature).map(|entry| entry.devices.clone())
        } else {
            self.results.remove(signature);
            None
        }
    }

    /// Stores a completed scan result.
    pub fn insert(
        &self,
        signature: ScanSignature,
        devices: Vec<DiscoveredDevice>,
        now: DateTime<Utc>,
    ) {
        self.results.insert(
            signature,
            CachedResult {
                devices,
                stored_at: now,
            },
        );
    }

    /// Returns the addresses incremental mode should skip: those seen
    /// responsive within [`INCREMENTAL_WINDOW`], provided a full scan of this
    /// exact range completed within the same window. Returns `None` when a
    /// full scan is due.
    pub fn incremental_skip_set(
        &self,
        range_key: &[Ipv4Addr],
        now: DateTime<Utc>,
    ) -> Option<BTreeSet<Ipv4Addr>> {
        let entry = self.recent.get(range_key)?;

        let since_full = now.signed_duration_since(entry.last_full_scan).to_std().ok()?;
        if since_full > INCREMENTAL_WINDOW {
            return None;
        }

        let skip = entry
            .responsive
            .iter()
            .filter(|(_, seen)| {
                now.signed_duration_since(**seen)
                    .to_std()
                    .map(|age| age <= INCREMENTAL_WINDOW)
                    .unwrap_or(false)
            })
            .map(|(addr, _)| *addr)
            .collect();
        Some(skip)
    }

    /// Records the responsive addresses from a scan; `full_scan` marks a run
    /// that covered the whole range rather than an incremental subset.
    pub fn record_scan(
        &self,
        range_key: Vec<Ipv4Addr>,
        responsive: &[Ipv4Addr],
        full_scan: bool,
        now: DateTime<Utc>,
    ) {
        let mut entry = self.recent.entry(range_key).or_insert_with(|| RecentScan {
            last_full_scan: now,
            responsive: HashMap::new(),
        });

        if full_scan {
            entry.last_full_scan = now;
        }
        for address in responsive {
            entry.responsive.insert(*address, now);
        }
    }
}
