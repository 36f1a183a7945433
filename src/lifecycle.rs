//! Readiness, game start, game over, rematch.
//!
//! The start decision is replicated: every peer checks the same condition,
//! but only the lexicographic minimum of the real peers actually starts.

use crate::app::App;
use crate::missions::initial_missions;
use crate::turn::end_turn;
use crate::types::{BASE_TIMEOUT_MS, COMPUTER_ID, PeerId};
use rand::Rng;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::info;

/// Sentinel word between the start decision and the first receive.
pub const GAME_STARTING: &str = "game_starting";

/// Declare ourselves ready. A lone peer gets the computer as an opponent.
pub async fn ready(app: &App) {
    let (me, alone) = {
        let mut state = app.state.lock().await;
        let me = state.own_id.clone();
        state.ready_players.insert(me.clone());
        let alone = state.players.iter().all(|p| *p == me);
        if alone {
            info!("no other peer around; the computer joins");
            state.ensure_peer(&COMPUTER_ID.to_string());
            state.ready_players.insert(COMPUTER_ID.to_string());
        }
        (me, alone)
    };

    if !alone {
        app.broadcast_to_peers("/api/notify-ready", json!({ "player_id": me }))
            .await;
    }
    maybe_start(app).await;
    app.broadcast_state().await;
}

/// A peer told us it is ready.
pub async fn notify_ready(app: &App, player_id: PeerId) {
    {
        let mut state = app.state.lock().await;
        state.ensure_peer(&player_id);
        state.ready_players.insert(player_id);
    }
    maybe_start(app).await;
    app.broadcast_state().await;
}

/// Start the game if everyone is ready, nothing is in flight, and we are
/// the initiator.
pub async fn maybe_start(app: &App) {
    let we_initiate = {
        let state = app.state.lock().await;
        let all_ready = !state.ready_players.is_empty()
            && state.players.iter().all(|p| state.ready_players.contains(p));
        let initiator = state.real_peers().min().cloned();
        all_ready && state.current_word.is_none() && initiator.as_ref() == Some(&state.own_id)
    };
    if we_initiate {
        start_game(app).await;
    }
}

/// Reinitialise everything, pick the starting letter, hand out the first
/// ball through the normal election.
pub async fn start_game(app: &App) {
    let (me, word) = {
        let mut state = app.state.lock().await;
        if state.current_word.is_some() {
            return;
        }
        state.reset_modifier_substate();
        state.history.clear();
        state.active_missions = initial_missions();

        let letter = {
            let mut rng = rand::thread_rng();
            (b'a' + rng.gen_range(0..26)) as char
        };
        info!("starting game with letter '{}'", letter);

        state.current_word = Some(GAME_STARTING.to_string());
        let me = state.own_id.clone();
        *state.turn_counts.entry(me.clone()).or_insert(0) += 1;
        (me, letter.to_string())
    };

    end_turn(app, me, word, BASE_TIMEOUT_MS, Vec::new(), false, false, BTreeSet::new()).await;
}

/// Close the game: archive it, remember the loser, reset everything.
///
/// Idempotent: a second call for the same loser on an already-reset peer
/// answers "Game already over.".
pub async fn game_over(app: &App, loser: PeerId, reason: &str) -> &'static str {
    let already_over = {
        let mut state = app.state.lock().await;
        let already_over = state.current_word.is_none()
            && state.history.is_empty()
            && state.last_loser.as_ref() == Some(&loser);
        if !already_over {
            info!("game over: {} lost ({})", loser, reason);
            if !state.history.is_empty() {
                let finished = std::mem::take(&mut state.history);
                state.archive.push(finished);
            }
            state.last_loser = Some(loser);
            state.reset_modifier_substate();
            state.ready_players.clear();
            state.active_player = None;
            state.reset_turn_fields();
        }
        already_over
    };
    app.broadcast_state().await;
    if already_over { "Game already over." } else { "OK" }
}

/// Play again with the same peers: archive, re-ready everyone, restart.
pub async fn rematch(app: &App, notify_peers: bool) {
    {
        let mut state = app.state.lock().await;
        info!("rematch requested");
        if !state.history.is_empty() {
            let finished = std::mem::take(&mut state.history);
            state.archive.push(finished);
        }
        state.reset_turn_fields();
        state.reset_modifier_substate();
        state.active_player = None;
        state.ready_players = state.players.clone();
    }
    if notify_peers {
        app.broadcast_to_peers("/api/rematch-broadcast", json!({})).await;
    }
    maybe_start(app).await;
    app.broadcast_state().await;
}
