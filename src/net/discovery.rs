//! Subnet sweep: find peers, then exchange full registrations.
//!
//! Discovery is pure best-effort. Probes are short-lived, concurrency is
//! capped to avoid exhausting sockets, and every transport error is
//! absorbed. Peers that never answer never enter the player set.

use super::message::RegisterPayload;
use crate::app::App;
use crate::types::{LISTEN_PORT, PeerId};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Upper bound on addresses swept in one discovery pass (a /22).
pub const MAX_SCAN_HOSTS: usize = 1024;

/// Concurrent probes in flight.
pub const SCAN_CONCURRENCY: usize = 50;

/// Host addresses of our subnet, excluding network, broadcast, and ourselves.
pub fn subnet_hosts(own: Ipv4Addr, cidr: u8) -> Vec<Ipv4Addr> {
    let own_bits = u32::from(own);
    let mask = if cidr == 0 { 0 } else { u32::MAX << (32 - cidr) };
    let network = own_bits & mask;
    let broadcast = network | !mask;

    let total = broadcast.saturating_sub(network + 1) as usize;
    if total > MAX_SCAN_HOSTS {
        warn!(
            "subnet /{} holds {} hosts; scanning the first {}",
            cidr, total, MAX_SCAN_HOSTS
        );
    }

    let mut hosts = Vec::with_capacity(total.min(MAX_SCAN_HOSTS));
    let mut addr = network + 1;
    while addr < broadcast && hosts.len() < MAX_SCAN_HOSTS {
        if addr != own_bits {
            hosts.push(Ipv4Addr::from(addr));
        }
        addr += 1;
    }
    hosts
}

/// Sweep the local subnet for peers and register with every responder.
pub async fn run(app: App) {
    let Some(cidr) = app.config.netmask_cidr else {
        debug!("discovery skipped: no usable netmask");
        return;
    };
    let own_ip: Ipv4Addr = match app.config.own_host.parse() {
        Ok(ip) => ip,
        Err(_) => {
            warn!(
                "OWN_HOST {:?} is not an IPv4 literal; discovery skipped",
                app.config.own_host
            );
            return;
        }
    };

    let hosts = subnet_hosts(own_ip, cidr);
    info!("discovery: probing {} hosts on /{}", hosts.len(), cidr);

    let slots = Arc::new(Semaphore::new(SCAN_CONCURRENCY));
    let mut tasks = Vec::with_capacity(hosts.len());
    for host in hosts {
        let app = app.clone();
        let slots = Arc::clone(&slots);
        tasks.push(tokio::spawn(async move {
            let Ok(_permit) = slots.acquire().await else {
                return;
            };
            let addr = format!("{}:{}", host, LISTEN_PORT);
            if let Some(identity) = app.transport.probe(&addr).await {
                info!("discovery: peer {} answered at {}", identity, addr);
                register_back(app, identity).await;
            }
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
    debug!("discovery sweep complete");
}

/// POST our full state to a peer's register endpoint. Best-effort.
pub async fn register_back(app: App, peer: PeerId) {
    let payload = {
        let state = app.state.lock().await;
        RegisterPayload::from_state(&state)
    };
    let body = match serde_json::to_value(&payload) {
        Ok(body) => body,
        Err(e) => {
            warn!("register payload failed to serialize: {}", e);
            return;
        }
    };
    if let Err(e) = app.transport.post_json(&peer, "/api/register", &body).await {
        debug!("register-back to {} failed: {}", peer, e);
    }
}
