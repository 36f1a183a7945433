//! Wire payloads exchanged between peers.
//!
//! The ball payload is a coherent snapshot of the whole game: the receiver
//! adopts it wholesale, which is what gives the protocol its happens-before
//! edge. Field names are part of the wire contract; the camelCase ones are
//! kept as-is for front-end compatibility.

use crate::missions::Mission;
use crate::state::GameState;
use crate::types::{BALL_SCHEMA_VERSION, HistoryEntry, LISTEN_PORT, PeerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

fn schema_version() -> u32 {
    BALL_SCHEMA_VERSION
}

/// Active mission as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionOnWire {
    pub id: String,
    #[serde(default)]
    pub current_step: u32,
}

/// Completed mission on the wire: identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMissionOnWire {
    pub id: String,
}

/// The ball: the running word plus all modifier state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallPayload {
    #[serde(default = "schema_version")]
    pub version: u32,
    pub word: String,
    pub timeout_ms: i64,
    #[serde(default)]
    pub player_vowel_powers: BTreeMap<PeerId, BTreeMap<char, f64>>,
    #[serde(default)]
    pub cursed_letters: BTreeSet<char>,
    #[serde(default)]
    pub dead_letters: BTreeSet<char>,
    #[serde(default)]
    pub player_phone_pads: BTreeMap<PeerId, BTreeMap<char, u8>>,
    #[serde(default)]
    pub player_letter_counts: BTreeMap<PeerId, BTreeMap<char, u32>>,
    #[serde(default)]
    pub player_max_timeouts: BTreeMap<PeerId, i64>,
    #[serde(default)]
    pub player_inabilities: BTreeMap<PeerId, BTreeSet<char>>,
    #[serde(default)]
    pub active_missions: Vec<MissionOnWire>,
    #[serde(default)]
    pub completed_missions: Vec<CompletedMissionOnWire>,
    #[serde(default)]
    pub letter_curse_counts: BTreeMap<char, u8>,
    #[serde(rename = "incomingPlayers", default)]
    pub incoming_players: BTreeSet<PeerId>,
    #[serde(rename = "incomingTurnCounts", default)]
    pub incoming_turn_counts: BTreeMap<PeerId, u32>,
    #[serde(rename = "incomingReadyPlayers", default)]
    pub incoming_ready_players: BTreeSet<PeerId>,
    #[serde(rename = "incomingHistory", default)]
    pub incoming_history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scramble_ui_for_player: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_letter: Option<char>,
}

impl BallPayload {
    /// Snapshot the full state into a ball around `word`.
    pub fn from_state(state: &GameState, word: String, timeout_ms: i64) -> Self {
        Self {
            version: BALL_SCHEMA_VERSION,
            word,
            timeout_ms,
            player_vowel_powers: state.player_vowel_powers.clone(),
            cursed_letters: state.cursed_letters.clone(),
            dead_letters: state.dead_letters.clone(),
            player_phone_pads: state.player_phone_pads.clone(),
            player_letter_counts: state.player_letter_counts.clone(),
            player_max_timeouts: state.player_max_timeouts.clone(),
            player_inabilities: state.player_inabilities.clone(),
            active_missions: state
                .active_missions
                .iter()
                .map(|m| MissionOnWire { id: m.kind.id().to_string(), current_step: m.current_step })
                .collect(),
            completed_missions: state
                .completed_missions
                .iter()
                .map(|m| CompletedMissionOnWire { id: m.kind.id().to_string() })
                .collect(),
            letter_curse_counts: state.letter_curse_counts.clone(),
            incoming_players: state.players.clone(),
            incoming_turn_counts: state.turn_counts.clone(),
            incoming_ready_players: state.ready_players.clone(),
            incoming_history: state.history.clone(),
            scramble_ui_for_player: state.scramble_ui_for_player.clone(),
            forced_letter: state.forced_letter,
        }
    }

    /// Adopt the snapshot into local state. Turn-local fields (word, timers)
    /// are the receiver's business and untouched here.
    pub fn apply_to(self, state: &mut GameState) {
        if self.version != BALL_SCHEMA_VERSION {
            debug!("ball schema version {} (ours: {})", self.version, BALL_SCHEMA_VERSION);
        }
        for p in &self.incoming_players {
            state.ensure_peer(p);
        }
        state.turn_counts.extend(self.incoming_turn_counts);
        state
            .ready_players
            .extend(self.incoming_ready_players.into_iter());
        state.history = self.incoming_history;

        state.player_vowel_powers = self.player_vowel_powers;
        state.player_phone_pads = self.player_phone_pads;
        state.player_letter_counts = self.player_letter_counts;
        state.player_max_timeouts = self.player_max_timeouts;
        state.player_inabilities = self.player_inabilities;
        state.cursed_letters = self.cursed_letters;
        state.dead_letters = self.dead_letters;
        state.letter_curse_counts = self.letter_curse_counts;
        state.scramble_ui_for_player = self.scramble_ui_for_player;
        state.forced_letter = self.forced_letter;

        state.active_missions = self
            .active_missions
            .iter()
            .filter_map(|m| Mission::from_wire(&m.id, m.current_step))
            .collect();
        state.completed_missions = self
            .completed_missions
            .iter()
            .filter_map(|m| Mission::from_wire(&m.id, 0))
            .collect();

        // The snapshot may predate peers we already know; re-fill their map
        // entries so every per-peer map keeps the full player key-set.
        let players: Vec<PeerId> = state.players.iter().cloned().collect();
        for p in &players {
            state.ensure_peer(p);
        }
    }
}

/// Registration handshake body. Modifier-state fields are optional so a
/// minimal `{ip}` first contact never wipes local state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub ip: String,
    #[serde(rename = "initialPlayers", default)]
    pub initial_players: BTreeSet<PeerId>,
    #[serde(rename = "initialTurnCounts", default)]
    pub initial_turn_counts: BTreeMap<PeerId, u32>,
    #[serde(rename = "initialReadyPlayers", default)]
    pub initial_ready_players: BTreeSet<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_vowel_powers: Option<BTreeMap<PeerId, BTreeMap<char, f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_phone_pads: Option<BTreeMap<PeerId, BTreeMap<char, u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_letter_counts: Option<BTreeMap<PeerId, BTreeMap<char, u32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_max_timeouts: Option<BTreeMap<PeerId, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_inabilities: Option<BTreeMap<PeerId, BTreeSet<char>>>,
    #[serde(default)]
    pub cursed_letters: BTreeSet<char>,
    #[serde(default)]
    pub dead_letters: BTreeSet<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_curse_counts: Option<BTreeMap<char, u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_missions: Option<Vec<MissionOnWire>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_missions: Option<Vec<CompletedMissionOnWire>>,
    #[serde(default)]
    pub archive: Vec<Vec<HistoryEntry>>,
}

impl RegisterPayload {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            ip: state.own_id.clone(),
            initial_players: state.players.clone(),
            initial_turn_counts: state.turn_counts.clone(),
            initial_ready_players: state.ready_players.clone(),
            player_vowel_powers: Some(state.player_vowel_powers.clone()),
            player_phone_pads: Some(state.player_phone_pads.clone()),
            player_letter_counts: Some(state.player_letter_counts.clone()),
            player_max_timeouts: Some(state.player_max_timeouts.clone()),
            player_inabilities: Some(state.player_inabilities.clone()),
            cursed_letters: state.cursed_letters.clone(),
            dead_letters: state.dead_letters.clone(),
            letter_curse_counts: Some(state.letter_curse_counts.clone()),
            active_missions: Some(
                state
                    .active_missions
                    .iter()
                    .map(|m| MissionOnWire { id: m.kind.id().to_string(), current_step: m.current_step })
                    .collect(),
            ),
            completed_missions: Some(
                state
                    .completed_missions
                    .iter()
                    .map(|m| CompletedMissionOnWire { id: m.kind.id().to_string() })
                    .collect(),
            ),
            archive: state.archive.clone(),
        }
    }

    /// Originating peer id; a bare IP is completed with the fixed port.
    pub fn origin_id(&self) -> PeerId {
        if self.ip.contains(':') {
            self.ip.clone()
        } else {
            format!("{}:{}", self.ip, LISTEN_PORT)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassBallPayload {
    #[serde(rename = "newWord")]
    pub new_word: String,
    pub client_timestamp_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub loser: PeerId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyReadyPayload {
    pub player_id: PeerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboPayload {
    pub combo_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::MissionKind;

    #[test]
    fn test_ball_roundtrip_keeps_wire_names() {
        let mut st = GameState::new("a:5000".into());
        st.ensure_peer(&"b:5000".into());
        st.active_missions = vec![Mission { kind: MissionKind::EchoParfait, current_step: 1 }];
        st.forced_letter = Some('u');

        let ball = BallPayload::from_state(&st, "ab".into(), 12_000);
        let value = serde_json::to_value(&ball).expect("serialize");
        assert!(value.get("incomingPlayers").is_some());
        assert!(value.get("incomingTurnCounts").is_some());
        assert_eq!(value["version"], 1);
        assert_eq!(value["active_missions"][0]["id"], "echo_parfait");

        let back: BallPayload = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.word, "ab");
        assert_eq!(back.forced_letter, Some('u'));
    }

    #[test]
    fn test_untagged_ball_parses_with_default_version() {
        let ball: BallPayload =
            serde_json::from_str(r#"{"word": "ab", "timeout_ms": 9000}"#).expect("parse");
        assert_eq!(ball.version, BALL_SCHEMA_VERSION);
        assert!(ball.incoming_players.is_empty());
    }

    #[test]
    fn test_apply_discards_unknown_missions() {
        let mut st = GameState::new("a:5000".into());
        let mut ball = BallPayload::from_state(&st.clone(), "ab".into(), 9_000);
        ball.active_missions = vec![
            MissionOnWire { id: "union_forcee".into(), current_step: 0 },
            MissionOnWire { id: "mission_inconnue".into(), current_step: 2 },
        ];
        ball.apply_to(&mut st);
        assert_eq!(st.active_missions.len(), 1);
        assert_eq!(st.active_missions[0].kind, MissionKind::UnionForcee);
    }

    #[test]
    fn test_bare_ip_origin_gets_port() {
        let payload = RegisterPayload { ip: "192.168.1.30".into(), ..Default::default() };
        assert_eq!(payload.origin_id(), "192.168.1.30:5000");
        let payload = RegisterPayload { ip: "192.168.1.30:5000".into(), ..Default::default() };
        assert_eq!(payload.origin_id(), "192.168.1.30:5000");
    }
}
