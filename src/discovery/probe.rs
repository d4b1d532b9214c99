//! Per-address probing: adaptive ICMP echo, reverse DNS and port sweep.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::classify::PROBE_PORTS;
use crate::config::DiscoverySettings;
use crate::models::ScanTarget;
use crate::providers::NetworkProber;

/// Timeout for the print-service and SNMP ports, which answer quickly when
/// present.
const FAST_PORT_TIMEOUT: Duration = Duration::from_millis(800);

/// Timeout for the web ports, which can be slower behind embedded servers.
const WEB_PORT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Cap on the first adaptive ping attempt.
const FIRST_ATTEMPT_CAP: Duration = Duration::from_secs(1);

/// What probing one responsive address produced.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// The probed address.
    pub address: Ipv4Addr,
    /// Reverse-DNS hostname, if resolution succeeded.
    pub hostname: Option<String>,
    /// Ports that accepted a TCP connection.
    pub open_ports: BTreeSet<u16>,
}

fn port_timeout(port: u16) -> Duration {
    match port {
        80 | 443 => WEB_PORT_TIMEOUT,
        _ => FAST_PORT_TIMEOUT,
    }
}

/// Sends an ICMP echo with an adaptive timeout split: the first attempt gets
/// half the budget (capped at one second), a second attempt gets whatever
/// remains.
async fn ping_adaptive(
    prober: &dyn NetworkProber,
    address: IpAddr,
    total_timeout: Duration,
) -> bool {
    let first = (total_timeout / 2).min(FIRST_ATTEMPT_CAP);
    if prober.ping(address, first).await {
        return true;
    }

    let remainder = total_timeout.saturating_sub(first);
    if remainder.is_zero() {
        return false;
    }
    prober.ping(address, remainder).await
}

/// Probes a single address.
///
/// The address is pinged with up to `scan_retries` additional attempts spaced
/// by `retry_delay`. Responsive hosts get a best-effort reverse-DNS lookup and
/// a concurrent sweep of the fixed port list. Returns `None` for hosts that
/// never answered or when cancelled; a cancelled probe contributes nothing.
pub async fn probe_address(
    prober: Arc<dyn NetworkProber>,
    target: ScanTarget,
    settings: &DiscoverySettings,
    cancel: &CancellationToken,
) -> Option<ProbeOutcome> {
    let ip = IpAddr::V4(target.address);
    let attempts = settings.scan_retries.saturating_add(1);

    let mut responsive = false;
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return None;
        }

        let ping = ping_adaptive(prober.as_ref(), ip, settings.scan_timeout);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            replied = ping => {
                if replied {
                    responsive = true;
                    break;
                }
            }
        }

        if attempt + 1 < attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(settings.retry_delay) => {}
            }
        }
    }

    if !responsive {
        return None;
    }

    let hostname = prober.reverse_lookup(ip).await;

    let port_checks = PROBE_PORTS.map(|port| {
        let prober = Arc::clone(&prober);
        async move { (port, prober.probe_port(ip, port, port_timeout(port)).await) }
    });
    let port_sweep = futures::future::join_all(port_checks);

    let results = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        results = port_sweep => results,
    };

    let open_ports = results
        .into_iter()
        .filter_map(|(port, open)| open.then_some(port))
        .collect();

    Some(ProbeOutcome {
        address: target.address,
        hostname,
        open_ports,
    })
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::providers::traits::MockNetworkProber;

    fn settings() -> DiscoverySettings {
        DiscoverySettings {
            ip_range: "10.0.0.1".into(),
            scan_timeout: Duration::from_secs(3),
            scan_retries: 0,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_ping_attempt_uses_half_timeout_capped_at_one_second() {
        let mut prober = MockNetworkProber::new();
        // 3s budget: half is 1.5s, capped to 1s.
        prober
            .expect_ping()
            .with(always(), eq(Duration::from_secs(1)))
            .times(1)
            .returning(|_, _| true);
        prober.expect_reverse_lookup().returning(|_| None);
        prober.expect_probe_port().returning(|_, _, _| false);

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings(),
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn second_ping_attempt_gets_the_remainder() {
        let mut prober = MockNetworkProber::new();
        let mut seq = mockall::Sequence::new();
        prober
            .expect_ping()
            .with(always(), eq(Duration::from_secs(1)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| false);
        prober
            .expect_ping()
            .with(always(), eq(Duration::from_secs(2)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| true);
        prober.expect_reverse_lookup().returning(|_| None);
        prober.expect_probe_port().returning(|_, _, _| false);

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings(),
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn unresponsive_address_yields_none_and_skips_ports() {
        let mut prober = MockNetworkProber::new();
        prober.expect_ping().times(2).returning(|_, _| false);
        prober.expect_reverse_lookup().never();
        prober.expect_probe_port().never();

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings(),
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn retries_ping_after_delay() {
        let mut prober = MockNetworkProber::new();
        let mut seq = mockall::Sequence::new();
        // First attempt: both adaptive pings fail.
        prober
            .expect_ping()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| false);
        // Retry attempt succeeds immediately.
        prober
            .expect_ping()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| true);
        prober.expect_reverse_lookup().returning(|_| None);
        prober.expect_probe_port().returning(|_, _, _| false);

        let mut settings = settings();
        settings.scan_retries = 1;

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn open_ports_are_collected() {
        let mut prober = MockNetworkProber::new();
        prober.expect_ping().returning(|_, _| true);
        prober
            .expect_reverse_lookup()
            .returning(|_| Some("hp-printer".into()));
        prober
            .expect_probe_port()
            .returning(|_, port, _| matches!(port, 9100 | 161));

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.open_ports, [161, 9100].into());
        assert_eq!(outcome.hostname.as_deref(), Some("hp-printer"));
    }

    #[tokio::test]
    async fn cancelled_probe_contributes_nothing() {
        let mut prober = MockNetworkProber::new();
        prober.expect_ping().returning(|_, _| true);
        prober.expect_reverse_lookup().never();
        prober.expect_probe_port().never();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = probe_address(
            Arc::new(prober),
            ScanTarget {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            &settings(),
            &cancel,
        )
        .await;

        assert!(outcome.is_none());
    }
}
