//! HTTP surface: the peer protocol and the front-end API.
//!
//! Handlers route straight into the turn controller and lifecycle; every
//! error a client can provoke maps to one `ApiError` variant and its
//! status code. Nothing else escapes to the transport layer.

use crate::app::App;
use crate::lifecycle;
use crate::net::discovery;
use crate::net::message::{
    BallPayload, ComboPayload, GameOverPayload, NotifyReadyPayload, PassBallPayload,
    RegisterPayload,
};
use crate::net::registry;
use crate::pad::ComboKey;
use crate::turn;
use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::cors::CorsLayer;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid word: {0}")]
    InvalidWord(String),
    #[error("letter '{0}' is blocked for you this turn")]
    LetterBlocked(char),
    #[error("timeout or not your turn")]
    NoActiveTurn,
    #[error("combo is not charged")]
    ComboNotReady,
    #[error("unknown combo key")]
    InvalidCombo,
    #[error("power-up is not charged")]
    PowerUpNotReady,
    #[error("no phone pad for this player")]
    NoPad,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidWord(_) | Self::ComboNotReady | Self::InvalidCombo | Self::PowerUpNotReady => {
                StatusCode::BAD_REQUEST
            }
            Self::LetterBlocked(_) => StatusCode::FORBIDDEN,
            Self::NoActiveTurn => StatusCode::REQUEST_TIMEOUT,
            Self::NoPad => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ping", get(ping))
        .route("/api/get-ball", get(get_ball))
        .route("/api/discover", post(discover))
        .route("/api/register", post(register))
        .route("/api/ready", post(ready))
        .route("/api/notify-ready", post(notify_ready))
        .route("/api/receive-ball", post(receive_ball))
        .route("/api/pass-ball", post(pass_ball))
        .route("/api/game-over", post(game_over))
        .route("/api/rematch", post(rematch))
        .route("/api/rematch-broadcast", post(rematch_broadcast))
        .route("/api/power-up", post(power_up))
        .route("/api/combo", post(combo))
        .route("/ws", get(crate::ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ping(State(app): State<App>) -> Json<Value> {
    Json(json!({ "message": "pong", "identity": app.config.own_id() }))
}

async fn get_ball(State(app): State<App>) -> Json<Value> {
    let word = {
        let state = app.state.lock().await;
        state.current_word.clone()
    };
    Json(json!({ "word": word }))
}

async fn discover(State(app): State<App>) -> Json<Value> {
    tokio::spawn(discovery::run(app.clone()));
    Json(json!({ "message": "Network discovery started." }))
}

async fn register(State(app): State<App>, Json(payload): Json<RegisterPayload>) -> Json<Value> {
    let (newcomer, players, turn_counts) = {
        let mut state = app.state.lock().await;
        let newcomer = registry::apply_register(&mut state, payload);
        (newcomer, state.players.clone(), state.turn_counts.clone())
    };
    if let Some(peer) = newcomer {
        tokio::spawn(discovery::register_back(app.clone(), peer));
    }
    app.broadcast_state().await;
    Json(json!({
        "message": "Registered.",
        "allPlayers": players,
        "allTurnCounts": turn_counts,
    }))
}

async fn ready(State(app): State<App>) -> Json<Value> {
    lifecycle::ready(&app).await;
    Json(json!({ "message": "Ready." }))
}

async fn notify_ready(
    State(app): State<App>,
    Json(payload): Json<NotifyReadyPayload>,
) -> Json<Value> {
    lifecycle::notify_ready(&app, payload.player_id).await;
    Json(json!({ "message": "OK" }))
}

async fn receive_ball(State(app): State<App>, Json(ball): Json<BallPayload>) -> Json<Value> {
    turn::receive_ball(&app, ball).await;
    Json(json!({ "message": "Ball received." }))
}

async fn pass_ball(
    State(app): State<App>,
    Json(payload): Json<PassBallPayload>,
) -> Result<Json<Value>, ApiError> {
    turn::pass_ball(&app, payload.new_word, payload.client_timestamp_ms)
        .await
        .map(Json)
}

async fn game_over(State(app): State<App>, Json(payload): Json<GameOverPayload>) -> Json<Value> {
    let reason = payload.reason.unwrap_or_else(|| "Unknown reason".to_string());
    let message = lifecycle::game_over(&app, payload.loser, &reason).await;
    Json(json!({ "message": message }))
}

async fn rematch(State(app): State<App>) -> Json<Value> {
    lifecycle::rematch(&app, true).await;
    Json(json!({ "message": "Rematch." }))
}

async fn rematch_broadcast(State(app): State<App>) -> Json<Value> {
    lifecycle::rematch(&app, false).await;
    Json(json!({ "message": "Rematch." }))
}

async fn power_up(State(app): State<App>) -> Result<Json<Value>, ApiError> {
    turn::trigger_power_up(&app).await.map(Json)
}

async fn combo(
    State(app): State<App>,
    Json(payload): Json<ComboPayload>,
) -> Result<Json<Value>, ApiError> {
    let key = ComboKey::parse(&payload.combo_key).ok_or(ApiError::InvalidCombo)?;
    turn::trigger_combo(&app, key).await.map(Json)
}
