//! Process-wide handle: the state store, the outbound transport, and the
//! UI update channel.

use crate::config::Config;
use crate::net::client::{HttpTransport, Transport};
use crate::state::{GameState, SharedState};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// Capacity of the UI snapshot channel; laggards drop old frames.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct App {
    pub state: SharedState,
    pub transport: Arc<dyn Transport>,
    /// Pre-serialized state snapshots fanned out to WebSocket subscribers.
    pub updates: broadcast::Sender<String>,
    pub config: Arc<Config>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Build with a caller-supplied transport; the seam tests stub through.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let state = Arc::new(Mutex::new(GameState::new(config.own_id())));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { state, transport, updates, config: Arc::new(config) }
    }

    /// Push the current derived state to every UI subscriber.
    ///
    /// The snapshot is taken under the lock, serialized and sent outside it.
    pub async fn broadcast_state(&self) {
        let snapshot = {
            let state = self.state.lock().await;
            state.snapshot()
        };
        // No subscribers is fine.
        let _ = self.updates.send(snapshot.to_string());
    }

    /// Best-effort POST to every remote peer. Failures are logged, never
    /// raised.
    pub async fn broadcast_to_peers(&self, path: &str, body: serde_json::Value) {
        let peers = {
            let state = self.state.lock().await;
            state.remote_peers()
        };
        let sends = peers.into_iter().map(|peer| {
            let transport = Arc::clone(&self.transport);
            let body = body.clone();
            let path = path.to_string();
            async move {
                if let Err(e) = transport.post_json(&peer, &path, &body).await {
                    debug!("broadcast {} to {} failed: {}", path, peer, e);
                }
            }
        });
        futures::future::join_all(sends).await;
    }
}
