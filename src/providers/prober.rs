//! System-level implementation of [`NetworkProber`] backed by ICMP raw
//! sockets, TCP connects and the system resolver.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};
use tokio::net::TcpStream;

use super::traits::NetworkProber;

/// Probes the network with real ICMP echoes, TCP connections and reverse DNS.
///
/// Requires permission to open raw ICMP sockets (root or `CAP_NET_RAW`).
pub struct SystemProber {
    client_v4: Client,
    client_v6: Client,
}

impl SystemProber {
    /// Creates a prober with ICMPv4 and ICMPv6 sockets.
    pub fn new() -> std::io::Result<Self> {
        let client_v4 = Client::new(&Config::default())?;
        let client_v6 = Client::new(&Config::builder().kind(ICMP::V6).build())?;
        Ok(Self {
            client_v4,
            client_v6,
        })
    }
}

#[async_trait]
impl NetworkProber for SystemProber {
    async fn ping(&self, address: IpAddr, timeout: Duration) -> bool {
        let client = match address {
            IpAddr::V4(_) => &self.client_v4,
            IpAddr::V6(_) => &self.client_v6,
        };

        let mut pinger = client
            .pinger(address, PingIdentifier(std::process::id() as u16))
            .await;
        pinger.timeout(timeout);

        pinger.ping(PingSequence(0), &[0u8; 56]).await.is_ok()
    }

    async fn probe_port(&self, address: IpAddr, port: u16, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect((address, port))).await,
            Ok(Ok(_))
        )
    }

    async fn reverse_lookup(&self, address: IpAddr) -> Option<String> {
        // The system resolver is blocking; keep it off the runtime threads.
        tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&address).ok())
            .await
            .ok()
            .flatten()
    }
}
