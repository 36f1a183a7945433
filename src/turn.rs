//! Turn controller: receive, validate, commit, elect, dispatch.
//!
//! Every mutation happens under the state lock; the election's health checks
//! and the dispatch itself run on snapshots outside it. The deadline timer
//! is a generation-checked single shot: bumping the generation cancels it,
//! and a stale firing is a no-op.

use crate::api::ApiError;
use crate::app::App;
use crate::computer;
use crate::lifecycle;
use crate::missions::run_missions;
use crate::net::message::BallPayload;
use crate::pad::{ComboKey, combo_available, letter_to_pad, power_up_available};
use crate::state::{GameState, empty_pad, full_vowel_powers};
use crate::timeout::calculate_next_timeout;
use crate::types::{
    BASE_TIMEOUT_MS, COMPUTER_ID, CURSE_THRESHOLD, HistoryEntry, MAX_VOWEL_POWER,
    PAD_CHARGE_THRESHOLD, PeerId, VOWELS, now_secs,
};
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of a committed move, before the next holder is known.
pub(crate) struct CommitOutcome {
    pub next_timeout: i64,
    pub ricochet: bool,
    pub mirror_move: bool,
}

// =============================================================================
// RECEIVE
// =============================================================================

/// Adopt an incoming ball: replace global state wholesale, start the local
/// turn, arm the deadline.
pub async fn receive_ball(app: &App, ball: BallPayload) {
    let (seq, timeout_ms, word) = {
        let mut state = app.state.lock().await;
        state.reset_turn_fields();

        let word = ball.word.clone();
        let timeout_ms = ball.timeout_ms;
        ball.apply_to(&mut state);

        let own = state.own_id.clone();
        state.current_word = Some(word.clone());
        state.active_player = Some(own);
        state.turn_start_time = Some(now_secs());
        state.current_turn_timeout_ms = timeout_ms;
        (state.deadline_seq, timeout_ms, word)
    };

    info!("ball received: word {:?}, {} ms to play", word, timeout_ms);
    arm_deadline(app, seq, timeout_ms);
    app.broadcast_state().await;
}

/// Arm the single-shot turn deadline for the given timer generation.
pub(crate) fn arm_deadline(app: &App, seq: u64, timeout_ms: i64) {
    let app = app.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(timeout_ms.max(0) as u64)).await;
        deadline_fired(&app, seq).await;
    });
}

/// A deadline fired; if its generation is still current, we lost.
pub async fn deadline_fired(app: &App, seq: u64) {
    let expired = {
        let state = app.state.lock().await;
        state.deadline_seq == seq && state.current_word.is_some()
    };
    if !expired {
        return;
    }
    warn!("turn deadline expired");
    lose_game(app, "Turn deadline expired".to_string()).await;
}

/// We lost: tell everyone, then reset locally.
pub(crate) async fn lose_game(app: &App, reason: String) {
    let loser = {
        let state = app.state.lock().await;
        state.own_id.clone()
    };
    app.broadcast_to_peers("/api/game-over", json!({ "loser": loser, "reason": reason }))
        .await;
    lifecycle::game_over(app, loser, &reason).await;
}

// =============================================================================
// PASS
// =============================================================================

enum PassDecision {
    DeadLetter(char),
    Committed(String, CommitOutcome),
}

/// The active player plays one letter.
pub async fn pass_ball(
    app: &App,
    new_word: String,
    client_timestamp_ms: i64,
) -> Result<serde_json::Value, ApiError> {
    let (me, decision) = {
        let mut state = app.state.lock().await;
        let current = state.current_word.clone().ok_or(ApiError::NoActiveTurn)?;

        if !new_word.starts_with(current.as_str())
            || new_word.chars().count() != current.chars().count() + 1
        {
            return Err(ApiError::InvalidWord(
                "new word must extend the current word by exactly one letter".into(),
            ));
        }
        let Some(letter) = new_word.chars().last() else {
            return Err(ApiError::InvalidWord("empty word".into()));
        };

        if let Some(forced) = state.forced_letter {
            if letter != forced {
                return Err(ApiError::InvalidWord(format!(
                    "the forced letter is '{}'",
                    forced
                )));
            }
            state.forced_letter = None;
        }

        let me = state.own_id.clone();
        if state.dead_letters.contains(&letter) {
            (me, PassDecision::DeadLetter(letter))
        } else {
            if state
                .player_inabilities
                .get(&me)
                .is_some_and(|blocked| blocked.contains(&letter))
            {
                return Err(ApiError::LetterBlocked(letter));
            }

            let response_time_ms = match state.turn_start_time {
                Some(started) => client_timestamp_ms - (started * 1000.0) as i64,
                None => state.current_turn_timeout_ms,
            };
            let turn_timeout_ms = state.current_turn_timeout_ms;
            let outcome = commit_move(&mut state, &me, &new_word, response_time_ms, turn_timeout_ms);
            (me, PassDecision::Committed(new_word, outcome))
        }
    };

    match decision {
        PassDecision::DeadLetter(letter) => {
            let reason = format!("Played dead letter {}", letter);
            info!("{}: immediate loss", reason);
            lose_game(app, reason.clone()).await;
            Ok(json!({ "message": format!("{}. You lose.", reason), "lost": true }))
        }
        PassDecision::Committed(word, outcome) => {
            end_turn(
                app,
                me,
                word,
                outcome.next_timeout,
                Vec::new(),
                outcome.ricochet,
                outcome.mirror_move,
                BTreeSet::new(),
            )
            .await;
            Ok(json!({ "message": "Ball passed." }))
        }
    }
}

/// Steps shared by human and computer moves: modifier updates, timeout
/// computation, history, curse escalation, missions.
pub(crate) fn commit_move(
    state: &mut GameState,
    player: &PeerId,
    new_word: &str,
    response_time_ms: i64,
    turn_timeout_ms: i64,
) -> CommitOutcome {
    state.cancel_deadline();
    if let Some(blocked) = state.player_inabilities.get_mut(player) {
        blocked.clear();
    }
    let letter = new_word.chars().last().unwrap_or_default();

    // A cursed letter spends its curse: the player's pad resets and the
    // letter's play counts restart everywhere.
    let cursed_malus = state.cursed_letters.remove(&letter);
    if cursed_malus {
        if let Some(pad) = state.player_phone_pads.get_mut(player) {
            for charge in pad.values_mut() {
                *charge = 0;
            }
        }
        for counts in state.player_letter_counts.values_mut() {
            counts.insert(letter, 0);
        }
    }

    if let Some(column) = letter_to_pad(letter) {
        let pad = state
            .player_phone_pads
            .entry(player.clone())
            .or_insert_with(empty_pad);
        let charge = pad.entry(column).or_insert(0);
        *charge = (*charge + 1).min(PAD_CHARGE_THRESHOLD);
    }

    let pad_combo_malus = state.attack_combo_player.as_ref() == Some(player);
    if pad_combo_malus {
        state.attack_combo_player = None;
    }

    let powers = state
        .player_vowel_powers
        .get(player)
        .cloned()
        .unwrap_or_else(full_vowel_powers);
    let computed =
        calculate_next_timeout(response_time_ms, new_word, &powers, cursed_malus, pad_combo_malus);
    let computed_timeout = computed.final_timeout_ms;
    state
        .player_vowel_powers
        .insert(player.clone(), computed.vowel_powers);
    state.history.push(HistoryEntry {
        player: player.clone(),
        word: new_word.to_string(),
        response_time_ms,
        applied_modifiers: computed.tags,
        timeout_log: computed.log,
    });

    // Curse escalation: three plays curse the letter, three more kill it.
    let plays = {
        let counts = state.player_letter_counts.entry(player.clone()).or_default();
        let c = counts.entry(letter).or_insert(0);
        *c += 1;
        *c
    };
    if plays >= CURSE_THRESHOLD {
        match state.letter_curse_counts.get(&letter).copied().unwrap_or(0) {
            0 => {
                info!("letter '{}' is now cursed", letter);
                state.cursed_letters.insert(letter);
                state.letter_curse_counts.insert(letter, 1);
            }
            1 => {
                info!("letter '{}' is now dead", letter);
                state.cursed_letters.remove(&letter);
                state.dead_letters.insert(letter);
                state.letter_curse_counts.insert(letter, 2);
            }
            _ => {}
        }
        if let Some(counts) = state.player_letter_counts.get_mut(player) {
            counts.insert(letter, 0);
        }
    }

    let (mission_tags, mission_outcome) =
        run_missions(state, player, new_word, response_time_ms, turn_timeout_ms);
    if !mission_tags.is_empty()
        && let Some(last) = state.history.last_mut()
    {
        last.applied_modifiers.extend(mission_tags);
    }

    let mut next_timeout = computed_timeout;
    if let Some(multiplier) = state.opponent_speed_multiplier.remove(player) {
        next_timeout = (next_timeout as f64 / multiplier).floor() as i64;
    }
    next_timeout = (next_timeout as f64 * state.base_timeout_modifier).floor() as i64;

    CommitOutcome {
        next_timeout,
        ricochet: mission_outcome.ricochet,
        mirror_move: mission_outcome.mirror_move,
    }
}

// =============================================================================
// END TURN
// =============================================================================

/// Elect the next holder, commit the hand-over, dispatch the ball.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn end_turn(
    app: &App,
    current_player: PeerId,
    word: String,
    next_timeout: i64,
    late_tags: Vec<String>,
    ricochet: bool,
    mirror_move: bool,
    new_inabilities: BTreeSet<char>,
) {
    // Phase 1: resolve mirror/ricochet and snapshot election candidates.
    let (word, decided, mut candidates) = {
        let mut state = app.state.lock().await;
        let mut word = word;
        let mut decided: Option<PeerId> = None;

        if mirror_move && state.history.len() >= 2 {
            // Undo the last move: rewind the word, hand the ball back.
            state.history.pop();
            if let Some(last) = state.history.last() {
                decided = Some(last.player.clone());
                word = last.word.clone();
            }
        } else if ricochet {
            decided = state
                .history
                .iter()
                .rev()
                .find(|e| e.player != current_player)
                .map(|e| e.player.clone());
        }

        let candidates: Vec<(PeerId, u32)> = if decided.is_none() {
            state
                .players
                .iter()
                .filter(|p| **p != current_player)
                .map(|p| (p.clone(), state.turn_counts.get(p).copied().unwrap_or(0)))
                .collect()
        } else {
            Vec::new()
        };
        (word, decided, candidates)
    };

    // Phase 2: election runs outside the lock; health checks are I/O.
    let own_id = {
        let state = app.state.lock().await;
        state.own_id.clone()
    };
    let next_holder = match decided {
        Some(holder) => holder,
        None => elect_next_holder(app, &own_id, &current_player, &mut candidates).await,
    };

    // Phase 3: commit the hand-over and snapshot the outgoing ball.
    let (ball, computer_deadline) = {
        let mut state = app.state.lock().await;
        *state.turn_counts.entry(next_holder.clone()).or_insert(0) += 1;
        state.active_player = Some(next_holder.clone());
        state
            .player_max_timeouts
            .insert(next_holder.clone(), next_timeout);

        if let Some(blocked) = state.player_inabilities.get_mut(&current_player) {
            blocked.clear();
        }
        if !new_inabilities.is_empty() {
            state
                .player_inabilities
                .entry(next_holder.clone())
                .or_default()
                .extend(new_inabilities.iter().copied());
        }
        if !late_tags.is_empty()
            && let Some(last) = state.history.last_mut()
        {
            last.applied_modifiers.extend(late_tags);
        }

        let ball = BallPayload::from_state(&state, word.clone(), next_timeout);
        if next_holder == COMPUTER_ID {
            // The ball never leaves the process: keep the word visible
            // while the computer thinks, deadline armed as for any turn.
            state.cancel_deadline();
            state.current_word = Some(word);
            state.turn_start_time = Some(now_secs());
            state.current_turn_timeout_ms = next_timeout;
            (ball, Some(state.deadline_seq))
        } else {
            state.reset_turn_fields();
            (ball, None)
        }
    };

    // Phase 4: dispatch.
    if next_holder == COMPUTER_ID {
        if let Some(seq) = computer_deadline {
            arm_deadline(app, seq, next_timeout);
        }
        computer::schedule_turn(app.clone(), ball);
    } else if next_holder == own_id {
        let app = app.clone();
        tokio::spawn(async move {
            receive_ball(&app, ball).await;
        });
    } else {
        match app.transport.send_ball(&next_holder, &ball).await {
            Ok(()) => info!("ball sent to {}", next_holder),
            Err(e) => {
                error!("could not hand the ball to {}: {}", next_holder, e);
                lose_game(app, format!("Could not reach {}", next_holder)).await;
                return;
            }
        }
    }

    app.broadcast_state().await;
}

/// Least-turns election with liveness checks.
///
/// The computer, when present, always takes the turn. Otherwise candidates
/// with the fewest turns are tried in random order; unreachable ones are
/// dropped. An empty pool returns the ball to the current player.
async fn elect_next_holder(
    app: &App,
    own_id: &PeerId,
    current_player: &PeerId,
    candidates: &mut Vec<(PeerId, u32)>,
) -> PeerId {
    if candidates.iter().any(|(p, _)| p == COMPUTER_ID) {
        return COMPUTER_ID.to_string();
    }
    loop {
        if candidates.is_empty() {
            return current_player.clone();
        }
        let min_turns = candidates.iter().map(|(_, c)| *c).min().unwrap_or(0);
        let pool: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, (_, c))| *c == min_turns)
            .map(|(i, _)| i)
            .collect();
        let index = {
            let mut rng = rand::thread_rng();
            pool.choose(&mut rng).copied().unwrap_or(0)
        };
        let (peer, _) = candidates[index].clone();
        if peer == *own_id || app.transport.health_check(&peer).await {
            return peer;
        }
        warn!("peer {} failed its health check; dropped from election", peer);
        candidates.remove(index);
    }
}

// =============================================================================
// COMBOS & POWER-UP
// =============================================================================

/// Spend a charged combo; ends the turn without playing a letter.
pub async fn trigger_combo(app: &App, key: ComboKey) -> Result<serde_json::Value, ApiError> {
    let (me, word, new_inabilities) = {
        let mut state = app.state.lock().await;
        let word = state.current_word.clone().ok_or(ApiError::NoActiveTurn)?;
        let me = state.own_id.clone();
        let pad = state.player_phone_pads.get(&me).ok_or(ApiError::NoPad)?;
        if !combo_available(pad, key) {
            return Err(ApiError::ComboNotReady);
        }

        let mut new_inabilities = BTreeSet::new();
        match key {
            ComboKey::Star => {
                state.cursed_letters.clear();
            }
            ComboKey::Zero => {
                state
                    .player_vowel_powers
                    .insert(me.clone(), VOWELS.iter().map(|v| (*v, MAX_VOWEL_POWER)).collect());
            }
            ComboKey::Hash => {
                new_inabilities = key.letters().collect();
                state.attack_combo_player = Some(me.clone());
            }
        }
        if let Some(pad) = state.player_phone_pads.get_mut(&me) {
            for column in key.columns() {
                pad.insert(*column, 0);
            }
        }
        state.cancel_deadline();
        (me, word, new_inabilities)
    };

    info!("combo {} spent", key.symbol());
    end_turn(
        app,
        me,
        word,
        BASE_TIMEOUT_MS,
        vec![format!("combo {}", key.symbol())],
        false,
        false,
        new_inabilities,
    )
    .await;
    Ok(json!({ "message": format!("Combo {} applied.", key.symbol()) }))
}

/// Spend the full pad; resets every player's pad and ends the turn.
pub async fn trigger_power_up(app: &App) -> Result<serde_json::Value, ApiError> {
    let (me, word) = {
        let mut state = app.state.lock().await;
        let word = state.current_word.clone().ok_or(ApiError::NoActiveTurn)?;
        let me = state.own_id.clone();
        let pad = state.player_phone_pads.get(&me).ok_or(ApiError::NoPad)?;
        if !power_up_available(pad) {
            return Err(ApiError::PowerUpNotReady);
        }
        for pad in state.player_phone_pads.values_mut() {
            for charge in pad.values_mut() {
                *charge = 0;
            }
        }
        state.cancel_deadline();
        (me, word)
    };

    info!("power-up spent");
    end_turn(
        app,
        me,
        word,
        BASE_TIMEOUT_MS,
        vec!["power-up".to_string()],
        false,
        false,
        BTreeSet::new(),
    )
    .await;
    Ok(json!({ "message": "Power-up applied." }))
}
