//! Integration tests for the discovery engine.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use printwatch::config::DiscoverySettings;
use printwatch::discovery::{DiscoveryEngine, DiscoveryError};
use printwatch::models::{
    Credential, DeviceInfo, DeviceType, DiscoveredDevice, DiscoveryMethod, SupplyReading,
};
use printwatch::providers::{
    AdapterError, DirectoryDiscovery, ProtocolAdapter,
};
use printwatch::test_helpers::{FakeHost, FakeProber};

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn settings(range: &str) -> DiscoverySettings {
    DiscoverySettings {
        ip_range: range.to_string(),
        scan_timeout: Duration::from_millis(100),
        max_concurrent_scans: 4,
        scan_retries: 0,
        retry_delay: Duration::from_millis(1),
        enable_snmp_fingerprint: false,
        enable_incremental: false,
        ..Default::default()
    }
}

struct StaticDirectory(Vec<DiscoveredDevice>);

#[async_trait]
impl DirectoryDiscovery for StaticDirectory {
    async fn query(&self) -> Result<Vec<DiscoveredDevice>, AdapterError> {
        Ok(self.0.clone())
    }
}

struct FailingDirectory;

#[async_trait]
impl DirectoryDiscovery for FailingDirectory {
    async fn query(&self) -> Result<Vec<DiscoveredDevice>, AdapterError> {
        Err(AdapterError::Timeout(ip(99)))
    }
}

struct StaticAdapter;

#[async_trait]
impl ProtocolAdapter for StaticAdapter {
    async fn probe_available(&self, _address: IpAddr, _credential: &Credential) -> bool {
        true
    }

    async fn get_device_info(
        &self,
        _address: IpAddr,
        _credential: &Credential,
    ) -> Result<Option<DeviceInfo>, AdapterError> {
        Ok(Some(DeviceInfo {
            vendor: Some("Kyocera".to_string()),
            model: Some("ECOSYS P3145dn".to_string()),
            serial: Some("VCF9192286".to_string()),
        }))
    }

    async fn get_supply_levels(
        &self,
        _address: IpAddr,
        _credential: &Credential,
    ) -> Result<Vec<SupplyReading>, AdapterError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn scan_keeps_printer_like_hosts_only() {
    let prober = FakeProber::new()
        .host(
            ip(1),
            FakeHost {
                hostname: Some("hp-laserjet-1".into()),
                open_ports: vec![9100, 161],
            },
        )
        .host(
            ip(2),
            FakeHost {
                hostname: Some("fileserver".into()),
                open_ports: vec![22],
            },
        );
    let engine = DiscoveryEngine::new(Arc::new(prober));

    let devices = engine
        .discover(&settings("10.0.0.1-5"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address, ip(1));
    assert_eq!(devices[0].device_type, DeviceType::Printer);
    assert_eq!(devices[0].method, DiscoveryMethod::SubnetScan);
    assert!(devices[0].open_ports.contains(&9100));
}

#[tokio::test]
async fn identical_request_within_ttl_hits_the_cache() {
    let prober = Arc::new(FakeProber::new().host(
        ip(1),
        FakeHost {
            hostname: None,
            open_ports: vec![9100],
        },
    ));
    let engine = DiscoveryEngine::new(Arc::clone(&prober) as Arc<dyn printwatch::providers::NetworkProber>);
    let scan_settings = settings("10.0.0.1-3");

    let first = engine
        .discover(&scan_settings, &CancellationToken::new())
        .await
        .unwrap();
    let pings_after_first = prober.ping_count();

    let second = engine
        .discover(&scan_settings, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        prober.ping_count(),
        pings_after_first,
        "Cached result must not trigger new probes"
    );
}

#[tokio::test]
async fn different_settings_bypass_the_cache() {
    let prober = Arc::new(FakeProber::new());
    let engine = DiscoveryEngine::new(Arc::clone(&prober) as Arc<dyn printwatch::providers::NetworkProber>);

    engine
        .discover(&settings("10.0.0.1-2"), &CancellationToken::new())
        .await
        .unwrap();
    let pings_after_first = prober.ping_count();

    let mut different = settings("10.0.0.1-2");
    different.scan_timeout = Duration::from_millis(200);
    engine
        .discover(&different, &CancellationToken::new())
        .await
        .unwrap();

    assert!(prober.ping_count() > pings_after_first);
}

#[tokio::test]
async fn incremental_scan_skips_recently_responsive_addresses() {
    let prober = Arc::new(
        FakeProber::new()
            .host(
                ip(1),
                FakeHost {
                    hostname: None,
                    open_ports: vec![9100],
                },
            )
            .host(
                ip(2),
                FakeHost {
                    hostname: None,
                    open_ports: vec![9100],
                },
            ),
    );
    let engine = DiscoveryEngine::new(Arc::clone(&prober) as Arc<dyn printwatch::providers::NetworkProber>);

    let mut first_settings = settings("10.0.0.1-4");
    first_settings.enable_incremental = true;
    engine
        .discover(&first_settings, &CancellationToken::new())
        .await
        .unwrap();
    let pings_after_first = prober.ping_count();
    assert_eq!(pings_after_first, 4 + 2); // 4 first attempts, 2 half-budget retries for silent hosts

    // Same range, different probe settings: misses the result cache but
    // keeps the incremental memory, so the two responsive hosts are skipped.
    let mut second_settings = first_settings.clone();
    second_settings.scan_timeout = Duration::from_millis(200);
    engine
        .discover(&second_settings, &CancellationToken::new())
        .await
        .unwrap();

    let new_pings = prober.ping_count() - pings_after_first;
    assert_eq!(new_pings, 2 + 2, "Only the two silent addresses are probed");
}

#[tokio::test]
async fn directory_source_merges_by_highest_confidence() {
    // Subnet scan sees the device with a weak signature (LPD only: 0.3).
    let prober = FakeProber::new().host(
        ip(1),
        FakeHost {
            hostname: None,
            open_ports: vec![515],
        },
    );
    let mut directory_device =
        DiscoveredDevice::from_source(ip(1), DiscoveryMethod::Directory, 0.8);
    directory_device.hostname = Some("print-ldap".into());

    let engine = DiscoveryEngine::new(Arc::new(prober))
        .with_directory(Arc::new(StaticDirectory(vec![directory_device])));

    let devices = engine
        .discover(&settings("10.0.0.1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].confidence, 0.8);
    assert_eq!(devices[0].method, DiscoveryMethod::Directory);
}

#[tokio::test]
async fn directory_failure_does_not_abort_discovery() {
    let prober = FakeProber::new().host(
        ip(1),
        FakeHost {
            hostname: None,
            open_ports: vec![9100],
        },
    );
    let engine = DiscoveryEngine::new(Arc::new(prober)).with_directory(Arc::new(FailingDirectory));

    let devices = engine
        .discover(&settings("10.0.0.1-2"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn snmp_fingerprint_enriches_and_boosts_confidence() {
    let prober = FakeProber::new().host(
        ip(1),
        FakeHost {
            hostname: None,
            open_ports: vec![9100, 161],
        },
    );
    let engine = DiscoveryEngine::new(Arc::new(prober)).with_adapter(Arc::new(StaticAdapter));

    let mut scan_settings = settings("10.0.0.1");
    scan_settings.enable_snmp_fingerprint = true;

    let devices = engine
        .discover(&scan_settings, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].vendor.as_deref(), Some("Kyocera"));
    assert_eq!(devices[0].serial.as_deref(), Some("VCF9192286"));
    // 0.4 (9100) + 0.2 (161) + 0.3 (fingerprint)
    assert!((devices[0].confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn invalid_range_fails_before_any_probe() {
    let prober = Arc::new(FakeProber::new());
    let engine = DiscoveryEngine::new(Arc::clone(&prober) as Arc<dyn printwatch::providers::NetworkProber>);

    let result = engine
        .discover(&settings("10.0.0.0/99"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(DiscoveryError::InvalidRange(_))));
    assert_eq!(prober.ping_count(), 0);
}

#[tokio::test]
async fn cancelled_discovery_returns_cancelled() {
    let prober = Arc::new(FakeProber::new().host(
        ip(1),
        FakeHost {
            hostname: None,
            open_ports: vec![9100],
        },
    ));
    let engine = DiscoveryEngine::new(Arc::clone(&prober) as Arc<dyn printwatch::providers::NetworkProber>);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine.discover(&settings("10.0.0.1-10"), &cancel).await;

    assert!(matches!(result, Err(DiscoveryError::Cancelled)));
}
