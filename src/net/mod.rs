//! Peer-to-peer plumbing: wire payloads, registry merge, discovery, client.

pub mod client;
pub mod discovery;
pub mod message;
pub mod registry;

// Re-exports
pub use client::{HttpTransport, NetError, Transport};
pub use message::{
    BallPayload, ComboPayload, CompletedMissionOnWire, GameOverPayload, MissionOnWire,
    NotifyReadyPayload, PassBallPayload, RegisterPayload,
};
pub use registry::apply_register;
