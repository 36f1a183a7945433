//! Register handshake merge semantics.
//!
//! Registration is commutative where it must be: player and ready sets
//! union, cursed/dead letter sets union, and the longer archive wins so
//! concurrent register exchanges converge.

use super::message::RegisterPayload;
use crate::missions::Mission;
use crate::state::GameState;
use crate::types::PeerId;
use tracing::info;

/// Merge an incoming registration into local state.
///
/// Returns the originator's id when it was previously unknown, in which case
/// the caller owes it a register-back.
pub fn apply_register(state: &mut GameState, payload: RegisterPayload) -> Option<PeerId> {
    let origin = payload.origin_id();
    let newcomer = !state.players.contains(&origin);
    if newcomer {
        info!("new peer registered: {}", origin);
    }
    state.ensure_peer(&origin);

    for p in &payload.initial_players {
        state.ensure_peer(p);
    }
    state.turn_counts.extend(payload.initial_turn_counts);
    state
        .ready_players
        .extend(payload.initial_ready_players.into_iter());

    // Submitted per-peer maps overwrite ours wholesale.
    if let Some(v) = payload.player_vowel_powers {
        state.player_vowel_powers = v;
    }
    if let Some(v) = payload.player_phone_pads {
        state.player_phone_pads = v;
    }
    if let Some(v) = payload.player_letter_counts {
        state.player_letter_counts = v;
    }
    if let Some(v) = payload.player_max_timeouts {
        state.player_max_timeouts = v;
    }
    if let Some(v) = payload.player_inabilities {
        state.player_inabilities = v;
    }
    if let Some(v) = payload.letter_curse_counts {
        state.letter_curse_counts = v;
    }

    // Letter sets union; merges commute across concurrent registers.
    state.cursed_letters.extend(payload.cursed_letters.into_iter());
    state.dead_letters.extend(payload.dead_letters.into_iter());

    // Longer archive wins; ties keep ours.
    if payload.archive.len() > state.archive.len() {
        state.archive = payload.archive;
    }

    if let Some(wire) = payload.active_missions {
        state.active_missions = wire
            .iter()
            .filter_map(|m| Mission::from_wire(&m.id, m.current_step))
            .collect();
    }
    if let Some(wire) = payload.completed_missions {
        state.completed_missions = wire
            .iter()
            .filter_map(|m| Mission::from_wire(&m.id, 0))
            .collect();
    }

    // Overwrites may have dropped entries for peers the sender has not met.
    let players: Vec<PeerId> = state.players.iter().cloned().collect();
    for p in &players {
        state.ensure_peer(p);
    }

    newcomer.then_some(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::message::MissionOnWire;
    use crate::types::HistoryEntry;

    fn entry(player: &str, word: &str) -> HistoryEntry {
        HistoryEntry {
            player: player.into(),
            word: word.into(),
            response_time_ms: 1000,
            applied_modifiers: vec![],
            timeout_log: Default::default(),
        }
    }

    #[test]
    fn test_newcomer_triggers_register_back() {
        let mut st = GameState::new("a:5000".into());
        let payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        assert_eq!(apply_register(&mut st, payload), Some("b:5000".into()));
        assert!(st.players.contains("b:5000"));
        // Second registration from the same peer is not a newcomer.
        let payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        assert_eq!(apply_register(&mut st, payload), None);
    }

    #[test]
    fn test_minimal_payload_keeps_local_maps() {
        let mut st = GameState::new("a:5000".into());
        st.player_vowel_powers
            .get_mut("a:5000")
            .and_then(|m| m.insert('a', 0.5));
        let payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        apply_register(&mut st, payload);
        assert_eq!(st.player_vowel_powers["a:5000"][&'a'], 0.5);
        // The newcomer still got fresh map entries.
        assert_eq!(st.player_vowel_powers["b:5000"][&'a'], 1.0);
    }

    #[test]
    fn test_letter_sets_union_and_archive_prefers_longer() {
        let mut st = GameState::new("a:5000".into());
        st.cursed_letters.insert('s');
        st.archive = vec![vec![entry("a:5000", "x")]];

        let mut payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        payload.cursed_letters.insert('t');
        payload.dead_letters.insert('q');
        payload.archive = vec![vec![entry("b:5000", "y")], vec![entry("b:5000", "yz")]];

        apply_register(&mut st, payload);
        assert!(st.cursed_letters.contains(&'s') && st.cursed_letters.contains(&'t'));
        assert!(st.dead_letters.contains(&'q'));
        assert_eq!(st.archive.len(), 2);

        // Same-length archive keeps ours.
        let mut payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        payload.archive = vec![vec![entry("b:5000", "z")], vec![entry("b:5000", "zz")]];
        apply_register(&mut st, payload);
        assert_eq!(st.archive[1][0].word, "yz");
    }

    #[test]
    fn test_unknown_mission_ids_discarded() {
        let mut st = GameState::new("a:5000".into());
        let mut payload = RegisterPayload { ip: "b:5000".into(), ..Default::default() };
        payload.active_missions = Some(vec![
            MissionOnWire { id: "frappe_eclair".into(), current_step: 2 },
            MissionOnWire { id: "not_a_mission".into(), current_step: 1 },
        ]);
        apply_register(&mut st, payload);
        assert_eq!(st.active_missions.len(), 1);
        assert_eq!(st.active_missions[0].current_step, 2);
    }
}
