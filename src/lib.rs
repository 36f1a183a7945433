pub mod api;
pub mod app;
pub mod computer;
pub mod config;
pub mod lifecycle;
pub mod missions;
pub mod net;
pub mod pad;
pub mod state;
pub mod timeout;
pub mod turn;
pub mod types;
pub mod ws;

pub use api::{ApiError, router};
pub use app::App;
pub use config::Config;
pub use missions::{ALL_MISSION_KINDS, Mission, MissionKind};
pub use net::{BallPayload, HttpTransport, NetError, RegisterPayload, Transport};
pub use pad::ComboKey;
pub use state::{GameState, SharedState};
pub use timeout::calculate_next_timeout;
pub use types::*;
