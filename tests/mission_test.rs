//! Mission engine behavior against real game state.

use std::collections::BTreeMap;
use wordball::missions::{Mission, MissionKind, run_missions};
use wordball::state::GameState;
use wordball::types::{BASE_TIMEOUT_MS, HistoryEntry, MAX_TIMEOUT_MS};

const A: &str = "a:5000";
const B: &str = "b:5000";

fn entry(player: &str, word: &str) -> HistoryEntry {
    HistoryEntry {
        player: player.into(),
        word: word.into(),
        response_time_ms: 1_000,
        applied_modifiers: Vec::new(),
        timeout_log: Default::default(),
    }
}

fn state_with(mission: MissionKind) -> GameState {
    let mut state = GameState::new(A.into());
    state.ensure_peer(&B.into());
    state.active_missions = vec![Mission::new(mission)];
    state
}

#[test]
fn test_union_forcee_compels_the_u() {
    let mut state = state_with(MissionKind::UnionForcee);
    state.history.push(entry(A, "aq"));

    let (tags, outcome) = run_missions(&mut state, &A.into(), "aq", 1_000, 10_000);

    assert_eq!(state.forced_letter, Some('u'));
    assert_eq!(tags, vec!["mission:Union forcée"]);
    assert!(!outcome.ricochet && !outcome.mirror_move);
    assert_eq!(state.completed_missions.len(), 1);
    // A fresh template replaced the fired one.
    assert_eq!(state.active_missions.len(), 1);
    assert_ne!(state.active_missions[0].kind, MissionKind::UnionForcee);
}

#[test]
fn test_echo_parfait_ricochets() {
    let mut state = state_with(MissionKind::EchoParfait);
    state.history.push(entry(B, "ab"));
    state.history.push(entry(A, "abb"));

    let (_, outcome) = run_missions(&mut state, &A.into(), "abb", 1_000, 10_000);
    assert!(outcome.ricochet);
    assert!(!outcome.mirror_move);
}

#[test]
fn test_symetrie_inversee_mirrors() {
    let mut state = state_with(MissionKind::SymetrieInversee);
    state.history.push(entry(B, "ab"));
    state.history.push(entry(A, "aba"));

    let (_, outcome) = run_missions(&mut state, &A.into(), "aba", 1_000, 10_000);
    assert!(outcome.mirror_move);
}

#[test]
fn test_mur_de_consonnes_boosts_own_max_timeout() {
    let mut state = state_with(MissionKind::MurDeConsonnes);
    state.active_missions[0].current_step = 3;
    state.history.push(entry(A, "abcd"));

    run_missions(&mut state, &A.into(), "abcd", 1_000, 10_000);
    assert_eq!(state.player_max_timeouts[A], (BASE_TIMEOUT_MS as f64 * 1.5) as i64);
}

#[test]
fn test_mur_de_consonnes_resets_on_vowel() {
    let mut state = state_with(MissionKind::MurDeConsonnes);
    state.active_missions[0].current_step = 3;
    state.history.push(entry(A, "abca"));

    run_missions(&mut state, &A.into(), "abca", 1_000, 10_000);
    assert!(state.completed_missions.is_empty());
    assert_eq!(state.active_missions[0].current_step, 0);
}

#[test]
fn test_frappe_eclair_rewards_speed() {
    let mut state = state_with(MissionKind::FrappeEclair);
    state.active_missions[0].current_step = 2;
    state.history.push(entry(A, "abc"));

    // Under a quarter of the allotted time.
    run_missions(&mut state, &A.into(), "abc", 1_000, 10_000);
    assert_eq!(state.opponent_speed_multiplier.get(A), Some(&1.2));
    assert_eq!(state.completed_missions.len(), 1);
}

#[test]
fn test_au_bord_du_precipice_maxes_own_timeout() {
    let mut state = state_with(MissionKind::AuBordDuPrecipice);
    state.history.push(entry(A, "ab"));

    run_missions(&mut state, &A.into(), "ab", 9_500, 10_000);
    assert_eq!(state.player_max_timeouts[A], MAX_TIMEOUT_MS);
}

#[test]
fn test_pression_constante_halves_base_modifier() {
    let mut state = state_with(MissionKind::PressionConstante);
    for i in 0..10 {
        state.history.push(entry(if i % 2 == 0 { A } else { B }, "ab"));
    }

    run_missions(&mut state, &A.into(), "ab", 1_000, 10_000);
    assert_eq!(state.base_timeout_modifier, 0.5);
}

#[test]
fn test_progression_alphabetique_scrambles_opponent() {
    let mut state = state_with(MissionKind::ProgressionAlphabetique);
    state.history.push(entry(A, "ab"));

    run_missions(&mut state, &A.into(), "ab", 1_000, 10_000);
    assert_eq!(state.scramble_ui_for_player.as_deref(), Some(B));
}

#[test]
fn test_replacement_never_repeats_a_template() {
    let mut state = state_with(MissionKind::CoupDuDictionnaire);
    state.completed_missions = vec![
        Mission::new(MissionKind::UnionForcee),
        Mission::new(MissionKind::EchoParfait),
    ];
    state.history.push(entry(A, "aw"));

    run_missions(&mut state, &A.into(), "aw", 1_000, 10_000);

    assert_eq!(state.active_missions.len(), 1);
    let replacement = state.active_missions[0].kind;
    assert_ne!(replacement, MissionKind::CoupDuDictionnaire);
    assert_ne!(replacement, MissionKind::UnionForcee);
    assert_ne!(replacement, MissionKind::EchoParfait);
    assert_eq!(state.completed_missions.len(), 3);
}

#[test]
fn test_letter_counts_sparse_maps_do_not_block_missions() {
    // Missions evaluate fine for a player with no letters played yet.
    let mut state = state_with(MissionKind::SuiteHarmonique);
    state.player_letter_counts.insert(A.into(), BTreeMap::new());
    state.history.push(entry(A, "aa"));

    run_missions(&mut state, &A.into(), "aa", 1_000, 10_000);
    assert_eq!(state.active_missions[0].current_step, 1);
}
