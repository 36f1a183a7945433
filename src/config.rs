//! Peer configuration: who we are and which subnet discovery scans.

use crate::types::{LISTEN_PORT, PeerId};
use std::net::UdpSocket;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    /// Our own IPv4 literal or hostname, as peers can reach us.
    pub own_host: String,
    /// Subnet prefix length for discovery. `None` disables discovery.
    pub netmask_cidr: Option<u8>,
    pub port: u16,
}

impl Config {
    /// Resolve configuration from the CLI/env inputs.
    ///
    /// An absent host falls back to autodetection; an unparsable CIDR is
    /// logged once and turns discovery into a no-op.
    pub fn resolve(own_host: Option<String>, netmask_cidr: &str) -> Self {
        let own_host = own_host.unwrap_or_else(detect_own_ip);
        let netmask_cidr = match netmask_cidr.parse::<u8>() {
            Ok(bits) if bits <= 30 => Some(bits),
            _ => {
                warn!("invalid NETMASK_CIDR {:?}; discovery disabled", netmask_cidr);
                None
            }
        };
        Self { own_host, netmask_cidr, port: LISTEN_PORT }
    }

    /// Our peer identifier, `"host:port"`.
    pub fn own_id(&self) -> PeerId {
        format!("{}:{}", self.own_host, self.port)
    }
}

/// Best local guess at our reachable IPv4 address.
///
/// Connecting a UDP socket toward a non-routable address never sends a
/// packet but forces the OS to pick the outbound interface.
fn detect_own_ip() -> String {
    let detected = UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| s.connect("10.255.255.255:1").map(|_| s))
        .and_then(|s| s.local_addr());
    match detected {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => "127.0.0.1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_cidr_disables_discovery() {
        let cfg = Config::resolve(Some("10.0.0.7".into()), "not-a-number");
        assert_eq!(cfg.netmask_cidr, None);
        assert_eq!(cfg.own_id(), "10.0.0.7:5000");
    }

    #[test]
    fn test_valid_cidr() {
        let cfg = Config::resolve(Some("192.168.1.20".into()), "24");
        assert_eq!(cfg.netmask_cidr, Some(24));
    }

    #[test]
    fn test_oversized_cidr_rejected() {
        let cfg = Config::resolve(Some("10.0.0.7".into()), "31");
        assert_eq!(cfg.netmask_cidr, None);
    }
}
