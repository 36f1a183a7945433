//! The built-in opponent for solo games.
//!
//! The computer "thinks" for a second, plays a uniformly random letter
//! (honoring a forced letter), and goes through the same commit path as a
//! human, with a synthetic response time.

use crate::app::App;
use crate::lifecycle;
use crate::net::message::BallPayload;
use crate::turn::{commit_move, end_turn};
use crate::types::COMPUTER_ID;
use rand::Rng;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

/// Fixed thinking pause before the computer moves.
const THINK_DELAY: Duration = Duration::from_secs(1);

/// Synthetic response time range, milliseconds.
const RESPONSE_RANGE_MS: std::ops::RangeInclusive<i64> = 300..=900;

/// The computer received the ball; its move runs detached.
pub fn schedule_turn(app: App, ball: BallPayload) {
    tokio::spawn(async move {
        tokio::time::sleep(THINK_DELAY).await;
        play_turn(&app, ball).await;
    });
}

enum Move {
    DeadLetter(char),
    Committed(String, crate::turn::CommitOutcome),
}

async fn play_turn(app: &App, ball: BallPayload) {
    let player = COMPUTER_ID.to_string();
    let decision = {
        let mut state = app.state.lock().await;
        let letter = match state.forced_letter.take() {
            Some(forced) => forced,
            None => {
                let mut rng = rand::thread_rng();
                (b'a' + rng.gen_range(0..26)) as char
            }
        };
        let new_word = format!("{}{}", ball.word, letter);
        info!("computer plays '{}' -> {:?}", letter, new_word);

        if state.dead_letters.contains(&letter) {
            Move::DeadLetter(letter)
        } else {
            let response_time_ms = {
                let mut rng = rand::thread_rng();
                rng.gen_range(RESPONSE_RANGE_MS)
            };
            let outcome =
                commit_move(&mut state, &player, &new_word, response_time_ms, ball.timeout_ms);
            Move::Committed(new_word, outcome)
        }
    };

    match decision {
        Move::DeadLetter(letter) => {
            let reason = format!("Played dead letter {}", letter);
            info!("computer loses: {}", reason);
            app.broadcast_to_peers("/api/game-over", json!({ "loser": player, "reason": reason }))
                .await;
            lifecycle::game_over(app, player, &reason).await;
        }
        Move::Committed(word, outcome) => {
            end_turn(
                app,
                player,
                word,
                outcome.next_timeout,
                Vec::new(),
                outcome.ricochet,
                outcome.mirror_move,
                BTreeSet::new(),
            )
            .await;
        }
    }
}
