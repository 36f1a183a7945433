//! Wordball peer entry point.
//!
//! One process is one peer: it serves the HTTP/WebSocket surface on the
//! fixed port, scans its subnet for other peers on demand, and plays the
//! word ping-pong protocol with whoever answers.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use wordball::types::LISTEN_PORT;
use wordball::{App, Config};

/// Wordball version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "wordball", version, about = "Wordball: peer-to-peer word game server")]
struct Args {
    /// Own IPv4 literal or hostname, as other peers can reach us
    #[arg(long, env = "OWN_HOST")]
    own_host: Option<String>,

    /// Subnet prefix length scanned by discovery (e.g. 24)
    #[arg(long, env = "NETMASK_CIDR", default_value = "24")]
    netmask_cidr: String,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wordball=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = Config::resolve(args.own_host, &args.netmask_cidr);

    info!("════════════════════════════════════════════════════════════");
    info!("  Wordball v{} — peer-to-peer word ping-pong", VERSION);
    info!("════════════════════════════════════════════════════════════");
    info!("Identity: {}", config.own_id());
    match config.netmask_cidr {
        Some(bits) => info!("Discovery subnet: /{}", bits),
        None => info!("Discovery: disabled"),
    }

    let app = App::new(config);
    let router = wordball::router(app);

    let listener = match TcpListener::bind(("0.0.0.0", LISTEN_PORT)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind port {}: {}", LISTEN_PORT, e);
            return;
        }
    };
    info!("Listening on 0.0.0.0:{}", LISTEN_PORT);
    info!("Waiting for peers; POST /api/discover to scan the subnet.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("server error: {}", e);
    }
}
