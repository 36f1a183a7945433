//! Outbound HTTP to other peers.
//!
//! Every call carries a short bounded timeout; callers decide whether a
//! failure is tolerated (discovery, register-back, broadcast) or terminal
//! (ball dispatch). The trait seam lets tests stub the sender.

use super::message::BallPayload;
use crate::types::PeerId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Discovery probe budget.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// Election health-check budget.
pub const HEALTH_TIMEOUT: Duration = Duration::from_millis(500);
/// Register / notify / broadcast budget.
pub const POST_TIMEOUT: Duration = Duration::from_secs(1);
/// Ball dispatch budget; failing this forfeits the game.
pub const SEND_BALL_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum NetError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Best-effort identity probe: `Some(identity)` on a pong.
    async fn probe(&self, peer: &str) -> Option<PeerId>;

    /// Liveness check used by the next-holder election.
    async fn health_check(&self, peer: &str) -> bool;

    /// Hand the ball to its next holder.
    async fn send_ball(&self, peer: &str, ball: &BallPayload) -> Result<(), NetError>;

    /// POST an arbitrary JSON body to a peer endpoint.
    async fn post_json(
        &self,
        peer: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), NetError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, peer: &str) -> Option<PeerId> {
        let url = format!("http://{}/api/ping", peer);
        let resp = self.client.get(&url).timeout(PROBE_TIMEOUT).send().await.ok()?;
        let body: serde_json::Value = resp.json().await.ok()?;
        if body.get("message").and_then(|m| m.as_str()) != Some("pong") {
            return None;
        }
        body.get("identity").and_then(|i| i.as_str()).map(str::to_string)
    }

    async fn health_check(&self, peer: &str) -> bool {
        let url = format!("http://{}/health", peer);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn send_ball(&self, peer: &str, ball: &BallPayload) -> Result<(), NetError> {
        let url = format!("http://{}/api/receive-ball", peer);
        self.client
            .post(&url)
            .timeout(SEND_BALL_TIMEOUT)
            .json(ball)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn post_json(
        &self,
        peer: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), NetError> {
        let url = format!("http://{}{}", peer, path);
        self.client
            .post(&url)
            .timeout(POST_TIMEOUT)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
