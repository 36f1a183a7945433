//! The game state store: one record, one lock.
//!
//! Every public operation of the crate mutates this record while holding the
//! mutex; anything dispatched over the network works from snapshots taken
//! before release. No references into the record escape the critical section.

use crate::missions::Mission;
use crate::pad::PAD_DIGITS;
use crate::types::{BASE_TIMEOUT_MS, COMPUTER_ID, HistoryEntry, PeerId, VOWELS};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedState = Arc<Mutex<GameState>>;

/// Full per-peer game state, including every modifier substructure.
#[derive(Debug, Clone)]
pub struct GameState {
    pub own_id: PeerId,
    /// Known peers; grows monotonically until game reset.
    pub players: BTreeSet<PeerId>,
    pub turn_counts: BTreeMap<PeerId, u32>,
    pub ready_players: BTreeSet<PeerId>,
    /// The ball. `None` when no turn is in flight; the sentinel
    /// `"game_starting"` between start decision and first receive.
    pub current_word: Option<String>,
    pub active_player: Option<PeerId>,
    /// Epoch seconds when the current turn started.
    pub turn_start_time: Option<f64>,
    pub current_turn_timeout_ms: i64,
    pub history: Vec<HistoryEntry>,
    pub archive: Vec<Vec<HistoryEntry>>,
    pub last_loser: Option<PeerId>,

    // Modifier substate.
    pub player_vowel_powers: BTreeMap<PeerId, BTreeMap<char, f64>>,
    pub player_phone_pads: BTreeMap<PeerId, BTreeMap<char, u8>>,
    pub player_letter_counts: BTreeMap<PeerId, BTreeMap<char, u32>>,
    pub player_max_timeouts: BTreeMap<PeerId, i64>,
    pub player_inabilities: BTreeMap<PeerId, BTreeSet<char>>,
    pub cursed_letters: BTreeSet<char>,
    pub dead_letters: BTreeSet<char>,
    pub letter_curse_counts: BTreeMap<char, u8>,
    pub active_missions: Vec<Mission>,
    pub completed_missions: Vec<Mission>,
    pub forced_letter: Option<char>,
    pub scramble_ui_for_player: Option<PeerId>,
    /// One-shot divisor for a peer's next computed timeout.
    pub opponent_speed_multiplier: BTreeMap<PeerId, f64>,
    /// Multiplicative global decay applied once per turn.
    pub base_timeout_modifier: f64,
    /// Peer whose own pad malus engages on their next turn.
    pub attack_combo_player: Option<PeerId>,

    /// Generation counter of the deadline timer. Bumping it cancels the
    /// armed timer; a fired timer whose generation is stale is a no-op.
    pub deadline_seq: u64,
}

impl GameState {
    pub fn new(own_id: PeerId) -> Self {
        let mut state = Self {
            own_id: own_id.clone(),
            players: BTreeSet::new(),
            turn_counts: BTreeMap::new(),
            ready_players: BTreeSet::new(),
            current_word: None,
            active_player: None,
            turn_start_time: None,
            current_turn_timeout_ms: 0,
            history: Vec::new(),
            archive: Vec::new(),
            last_loser: None,
            player_vowel_powers: BTreeMap::new(),
            player_phone_pads: BTreeMap::new(),
            player_letter_counts: BTreeMap::new(),
            player_max_timeouts: BTreeMap::new(),
            player_inabilities: BTreeMap::new(),
            cursed_letters: BTreeSet::new(),
            dead_letters: BTreeSet::new(),
            letter_curse_counts: BTreeMap::new(),
            active_missions: Vec::new(),
            completed_missions: Vec::new(),
            forced_letter: None,
            scramble_ui_for_player: None,
            opponent_speed_multiplier: BTreeMap::new(),
            base_timeout_modifier: 1.0,
            attack_combo_player: None,
            deadline_seq: 0,
        };
        state.ensure_peer(&own_id);
        state
    }

    /// Register a peer and give every per-peer map an entry for it, so the
    /// map key-sets always equal the player set.
    pub fn ensure_peer(&mut self, peer: &PeerId) {
        self.players.insert(peer.clone());
        self.turn_counts.entry(peer.clone()).or_insert(0);
        self.player_vowel_powers
            .entry(peer.clone())
            .or_insert_with(full_vowel_powers);
        self.player_phone_pads
            .entry(peer.clone())
            .or_insert_with(empty_pad);
        self.player_letter_counts.entry(peer.clone()).or_default();
        self.player_max_timeouts
            .entry(peer.clone())
            .or_insert(BASE_TIMEOUT_MS);
        self.player_inabilities.entry(peer.clone()).or_default();
    }

    /// Peers other than the reserved computer opponent.
    pub fn real_peers(&self) -> impl Iterator<Item = &PeerId> {
        self.players.iter().filter(|p| p.as_str() != COMPUTER_ID)
    }

    /// Remote peers we contact over HTTP.
    pub fn remote_peers(&self) -> Vec<PeerId> {
        self.real_peers()
            .filter(|p| **p != self.own_id)
            .cloned()
            .collect()
    }

    /// Some player other than `player`, for effects aimed at "the opponent".
    pub fn opponent_of(&self, player: &PeerId) -> Option<PeerId> {
        self.players.iter().find(|p| *p != player).cloned()
    }

    /// Cancel any armed deadline timer. Idempotent.
    pub fn cancel_deadline(&mut self) {
        self.deadline_seq += 1;
    }

    /// Drop the in-flight turn; the ball is no longer here.
    pub fn reset_turn_fields(&mut self) {
        self.cancel_deadline();
        self.current_word = None;
        self.turn_start_time = None;
        self.current_turn_timeout_ms = 0;
    }

    /// Re-initialise all modifier substate and per-game counters from the
    /// current player set. Called on game start and on game over.
    pub fn reset_modifier_substate(&mut self) {
        let players: Vec<PeerId> = self.players.iter().cloned().collect();
        self.player_vowel_powers.clear();
        self.player_phone_pads.clear();
        self.player_letter_counts.clear();
        self.player_max_timeouts.clear();
        self.player_inabilities.clear();
        self.turn_counts.clear();
        for p in &players {
            self.ensure_peer(p);
        }
        self.cursed_letters.clear();
        self.dead_letters.clear();
        self.letter_curse_counts.clear();
        self.active_missions.clear();
        self.completed_missions.clear();
        self.forced_letter = None;
        self.scramble_ui_for_player = None;
        self.opponent_speed_multiplier.clear();
        self.base_timeout_modifier = 1.0;
        self.attack_combo_player = None;
    }

    /// Full derived-state snapshot pushed to UI subscribers.
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "self": self.own_id,
            "players": self.players,
            "ready_players": self.ready_players,
            "history": self.history,
            "archive": self.archive,
            "word": self.current_word,
            "timeout_ms": self.current_turn_timeout_ms,
            "player_vowel_powers": self.player_vowel_powers,
            "cursed_letters": self.cursed_letters,
            "dead_letters": self.dead_letters,
            "player_phone_pads": self.player_phone_pads,
            "player_max_timeouts": self.player_max_timeouts,
            "player_inabilities": self.player_inabilities,
            "active_player": self.active_player,
            "active_missions": self.active_missions.iter().map(|m| json!({
                "id": m.kind.id(),
                "name": m.kind.name(),
                "description": m.kind.description(),
                "goal": m.kind.goal(),
                "current_step": m.current_step,
            })).collect::<Vec<_>>(),
            "completed_missions": self.completed_missions.iter().map(|m| json!({
                "id": m.kind.id(),
                "name": m.kind.name(),
            })).collect::<Vec<_>>(),
            "scramble_ui_for_player": self.scramble_ui_for_player,
            "forced_letter": self.forced_letter,
        })
    }
}

pub fn full_vowel_powers() -> BTreeMap<char, f64> {
    VOWELS.iter().map(|v| (*v, 1.0)).collect()
}

pub fn empty_pad() -> BTreeMap<char, u8> {
    PAD_DIGITS.iter().map(|d| (*d, 0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_peer_fills_every_map() {
        let mut st = GameState::new("a:5000".into());
        st.ensure_peer(&"b:5000".into());
        for p in ["a:5000", "b:5000"] {
            let p = p.to_string();
            assert!(st.player_vowel_powers.contains_key(&p));
            assert!(st.player_phone_pads.contains_key(&p));
            assert!(st.player_letter_counts.contains_key(&p));
            assert!(st.player_max_timeouts.contains_key(&p));
            assert!(st.player_inabilities.contains_key(&p));
        }
        assert_eq!(st.player_vowel_powers["b:5000"][&'a'], 1.0);
        assert_eq!(st.player_phone_pads["b:5000"][&'2'], 0);
        assert_eq!(st.player_max_timeouts["b:5000"], BASE_TIMEOUT_MS);
    }

    #[test]
    fn test_reset_keeps_players_and_clears_modifiers() {
        let mut st = GameState::new("a:5000".into());
        st.ensure_peer(&"b:5000".into());
        st.cursed_letters.insert('s');
        st.dead_letters.insert('q');
        st.forced_letter = Some('u');
        st.base_timeout_modifier = 0.5;
        st.turn_counts.insert("b:5000".into(), 7);

        st.reset_modifier_substate();

        assert_eq!(st.players.len(), 2);
        assert!(st.cursed_letters.is_empty());
        assert!(st.dead_letters.is_empty());
        assert_eq!(st.forced_letter, None);
        assert_eq!(st.base_timeout_modifier, 1.0);
        assert_eq!(st.turn_counts["b:5000"], 0);
    }

    #[test]
    fn test_cancel_deadline_is_idempotent() {
        let mut st = GameState::new("a:5000".into());
        st.cancel_deadline();
        let seq = st.deadline_seq;
        st.cancel_deadline();
        st.cancel_deadline();
        assert!(st.deadline_seq > seq);
    }

    #[test]
    fn test_snapshot_carries_mission_metadata() {
        let mut st = GameState::new("a:5000".into());
        st.active_missions = vec![Mission::new(crate::missions::MissionKind::UnionForcee)];
        let snap = st.snapshot();
        assert_eq!(snap["self"], "a:5000");
        assert_eq!(snap["active_missions"][0]["id"], "union_forcee");
        assert_eq!(snap["active_missions"][0]["goal"], 1);
    }
}
