//! Mission engine: stateful play-pattern rules with one-shot effects.
//!
//! Each template is one `MissionKind` variant; progress, trigger, and effect
//! are match arms over the kind, so the template table stays data-only and
//! the wire format is just `{id, current_step}`.

use crate::state::GameState;
use crate::types::{HistoryEntry, MAX_TIMEOUT_MS, PeerId, is_vowel};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Missions active at any time per game.
pub const ACTIVE_MISSION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    SuiteHarmonique,
    MurDeConsonnes,
    EchoParfait,
    ProgressionAlphabetique,
    SymetrieInversee,
    FrappeEclair,
    AuBordDuPrecipice,
    PressionConstante,
    CoupDuDictionnaire,
    UnionForcee,
}

pub const ALL_MISSION_KINDS: [MissionKind; 10] = [
    MissionKind::SuiteHarmonique,
    MissionKind::MurDeConsonnes,
    MissionKind::EchoParfait,
    MissionKind::ProgressionAlphabetique,
    MissionKind::SymetrieInversee,
    MissionKind::FrappeEclair,
    MissionKind::AuBordDuPrecipice,
    MissionKind::PressionConstante,
    MissionKind::CoupDuDictionnaire,
    MissionKind::UnionForcee,
];

impl MissionKind {
    /// Stable wire identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Self::SuiteHarmonique => "suite_harmonique",
            Self::MurDeConsonnes => "mur_de_consonnes",
            Self::EchoParfait => "echo_parfait",
            Self::ProgressionAlphabetique => "progression_alphabetique",
            Self::SymetrieInversee => "symetrie_inversee",
            Self::FrappeEclair => "frappe_eclair",
            Self::AuBordDuPrecipice => "au_bord_du_precipice",
            Self::PressionConstante => "pression_constante",
            Self::CoupDuDictionnaire => "coup_du_dictionnaire",
            Self::UnionForcee => "union_forcee",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        ALL_MISSION_KINDS.iter().copied().find(|k| k.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SuiteHarmonique => "Suite harmonique",
            Self::MurDeConsonnes => "Mur de consonnes",
            Self::EchoParfait => "Écho parfait",
            Self::ProgressionAlphabetique => "Progression alphabétique",
            Self::SymetrieInversee => "Symétrie inversée",
            Self::FrappeEclair => "Frappe éclair",
            Self::AuBordDuPrecipice => "Au bord du précipice",
            Self::PressionConstante => "Pression constante",
            Self::CoupDuDictionnaire => "Coup du dictionnaire",
            Self::UnionForcee => "Union forcée",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SuiteHarmonique => "Jouer trois voyelles d'affilée",
            Self::MurDeConsonnes => "Jouer quatre consonnes d'affilée",
            Self::EchoParfait => "Deux mots consécutifs finissant par la même lettre",
            Self::ProgressionAlphabetique => "Deux lettres finales consécutives dans l'alphabet",
            Self::SymetrieInversee => "Former un palindrome",
            Self::FrappeEclair => "Trois réponses en moins d'un quart du temps imparti",
            Self::AuBordDuPrecipice => "Répondre dans les derniers 10% du temps imparti",
            Self::PressionConstante => "Atteindre un multiple de dix tours",
            Self::CoupDuDictionnaire => "Jouer une lettre rare (k, w, x, y, z)",
            Self::UnionForcee => "Jouer la lettre q",
        }
    }

    /// Steps needed before the trigger can fire; 1 for event-driven missions.
    pub fn goal(&self) -> u32 {
        match self {
            Self::SuiteHarmonique | Self::FrappeEclair => 3,
            Self::MurDeConsonnes => 4,
            _ => 1,
        }
    }
}

/// A live mission instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub kind: MissionKind,
    pub current_step: u32,
}

impl Mission {
    pub fn new(kind: MissionKind) -> Self {
        Self { kind, current_step: 0 }
    }

    /// Rebuild an instance from its wire id, discarding unknown ids.
    pub fn from_wire(id: &str, current_step: u32) -> Option<Self> {
        MissionKind::from_id(id).map(|kind| Mission { kind, current_step })
    }
}

/// Everything a trigger may inspect about the move just committed.
pub struct MissionContext<'a> {
    pub player: &'a str,
    pub letter: char,
    pub new_word: &'a str,
    pub response_time_ms: i64,
    pub turn_timeout_ms: i64,
    pub history: &'a [HistoryEntry],
    pub letter_counts: &'a BTreeMap<char, u32>,
}

/// Flags a triggered mission hands back to the turn controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissionOutcome {
    /// Ball goes straight back to the opponent.
    pub ricochet: bool,
    /// The last move is undone.
    pub mirror_move: bool,
}

fn progress(mission: &mut Mission, ctx: &MissionContext<'_>) {
    match mission.kind {
        MissionKind::SuiteHarmonique => {
            if is_vowel(ctx.letter) {
                mission.current_step += 1;
            } else {
                mission.current_step = 0;
            }
        }
        MissionKind::MurDeConsonnes => {
            if !is_vowel(ctx.letter) {
                mission.current_step += 1;
            } else {
                mission.current_step = 0;
            }
        }
        MissionKind::FrappeEclair => {
            if ctx.turn_timeout_ms > 0 && ctx.response_time_ms * 4 < ctx.turn_timeout_ms {
                mission.current_step += 1;
            } else {
                mission.current_step = 0;
            }
        }
        _ => {}
    }
}

fn triggered(mission: &Mission, ctx: &MissionContext<'_>) -> bool {
    match mission.kind {
        MissionKind::SuiteHarmonique | MissionKind::FrappeEclair => mission.current_step >= 3,
        MissionKind::MurDeConsonnes => mission.current_step >= 4,
        MissionKind::EchoParfait => {
            let n = ctx.history.len();
            n >= 2
                && ctx.history[n - 1].last_letter().is_some()
                && ctx.history[n - 1].last_letter() == ctx.history[n - 2].last_letter()
        }
        MissionKind::ProgressionAlphabetique => {
            let tail: Vec<char> = ctx.new_word.chars().rev().take(2).collect();
            tail.len() == 2 && (tail[0] as i32 - tail[1] as i32).abs() == 1
        }
        MissionKind::SymetrieInversee => {
            let chars: Vec<char> = ctx.new_word.chars().collect();
            chars.len() > 1 && chars.iter().eq(chars.iter().rev())
        }
        MissionKind::AuBordDuPrecipice => {
            ctx.response_time_ms * 10 > ctx.turn_timeout_ms * 9 && ctx.turn_timeout_ms > 0
        }
        MissionKind::PressionConstante => {
            !ctx.history.is_empty() && ctx.history.len() % 10 == 0
        }
        MissionKind::CoupDuDictionnaire => matches!(ctx.letter, 'k' | 'w' | 'x' | 'y' | 'z'),
        MissionKind::UnionForcee => ctx.letter == 'q',
    }
}

fn apply_effect(
    kind: MissionKind,
    player: &PeerId,
    state: &mut GameState,
    outcome: &mut MissionOutcome,
) {
    match kind {
        MissionKind::SuiteHarmonique => {
            state.opponent_speed_multiplier.insert(player.clone(), 1.3);
        }
        MissionKind::MurDeConsonnes => {
            let entry = state.player_max_timeouts.entry(player.clone()).or_default();
            *entry = (*entry as f64 * 1.5) as i64;
        }
        MissionKind::EchoParfait => outcome.ricochet = true,
        MissionKind::ProgressionAlphabetique => {
            state.scramble_ui_for_player = state.opponent_of(player);
        }
        MissionKind::SymetrieInversee => outcome.mirror_move = true,
        MissionKind::FrappeEclair => {
            state.opponent_speed_multiplier.insert(player.clone(), 1.2);
        }
        MissionKind::AuBordDuPrecipice => {
            state.player_max_timeouts.insert(player.clone(), MAX_TIMEOUT_MS);
        }
        MissionKind::PressionConstante => state.base_timeout_modifier = 0.5,
        MissionKind::CoupDuDictionnaire => {}
        MissionKind::UnionForcee => state.forced_letter = Some('u'),
    }
}

/// Sample the starting mission set, uniformly without replacement.
pub fn initial_missions() -> Vec<Mission> {
    let mut rng = rand::thread_rng();
    ALL_MISSION_KINDS
        .choose_multiple(&mut rng, ACTIVE_MISSION_COUNT)
        .map(|k| Mission::new(*k))
        .collect()
}

/// Advance every active mission for the committed move, fire triggers, apply
/// effects, and refill the active set from unused templates.
///
/// Returns the history tags of fired missions and the collected flags.
pub fn run_missions(
    state: &mut GameState,
    player: &PeerId,
    new_word: &str,
    response_time_ms: i64,
    turn_timeout_ms: i64,
) -> (Vec<String>, MissionOutcome) {
    let mut missions = std::mem::take(&mut state.active_missions);
    let letter = new_word.chars().last().unwrap_or_default();
    let empty_counts = BTreeMap::new();

    let mut fired = Vec::new();
    let mut survivors = Vec::new();
    {
        let ctx = MissionContext {
            player,
            letter,
            new_word,
            response_time_ms,
            turn_timeout_ms,
            history: &state.history,
            letter_counts: state
                .player_letter_counts
                .get(player)
                .unwrap_or(&empty_counts),
        };
        for mut mission in missions.drain(..) {
            progress(&mut mission, &ctx);
            if triggered(&mission, &ctx) {
                fired.push(mission);
            } else {
                survivors.push(mission);
            }
        }
    }

    let mut tags = Vec::new();
    let mut outcome = MissionOutcome::default();
    for mission in &fired {
        apply_effect(mission.kind, player, state, &mut outcome);
        tags.push(format!("mission:{}", mission.kind.name()));
        state.completed_missions.push(mission.clone());
    }

    // Refill from templates never instantiated this game.
    let replacements_needed = fired.len();
    if replacements_needed > 0 {
        let mut unused: Vec<MissionKind> = ALL_MISSION_KINDS
            .iter()
            .copied()
            .filter(|k| {
                !survivors.iter().any(|m| m.kind == *k)
                    && !state.completed_missions.iter().any(|m| m.kind == *k)
            })
            .collect();
        let mut rng = rand::thread_rng();
        unused.shuffle(&mut rng);
        survivors.extend(unused.into_iter().take(replacements_needed).map(Mission::new));
    }

    state.active_missions = survivors;
    (tags, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        letter: char,
        new_word: &'a str,
        response_time_ms: i64,
        turn_timeout_ms: i64,
        history: &'a [HistoryEntry],
        counts: &'a BTreeMap<char, u32>,
    ) -> MissionContext<'a> {
        MissionContext {
            player: "p1:5000",
            letter,
            new_word,
            response_time_ms,
            turn_timeout_ms,
            history,
            letter_counts: counts,
        }
    }

    #[test]
    fn test_vowel_streak_progress_and_reset() {
        let counts = BTreeMap::new();
        let mut m = Mission::new(MissionKind::SuiteHarmonique);
        for _ in 0..2 {
            progress(&mut m, &ctx('a', "ba", 0, 0, &[], &counts));
        }
        assert_eq!(m.current_step, 2);
        assert!(!triggered(&m, &ctx('a', "ba", 0, 0, &[], &counts)));
        progress(&mut m, &ctx('b', "bab", 0, 0, &[], &counts));
        assert_eq!(m.current_step, 0);
    }

    #[test]
    fn test_palindrome_trigger() {
        let counts = BTreeMap::new();
        let m = Mission::new(MissionKind::SymetrieInversee);
        assert!(triggered(&m, &ctx('a', "aba", 0, 0, &[], &counts)));
        assert!(!triggered(&m, &ctx('a', "a", 0, 0, &[], &counts)));
        assert!(!triggered(&m, &ctx('c', "abc", 0, 0, &[], &counts)));
    }

    #[test]
    fn test_alphabetic_progression_trigger() {
        let counts = BTreeMap::new();
        let m = Mission::new(MissionKind::ProgressionAlphabetique);
        assert!(triggered(&m, &ctx('b', "ab", 0, 0, &[], &counts)));
        assert!(triggered(&m, &ctx('a', "ba", 0, 0, &[], &counts)));
        assert!(!triggered(&m, &ctx('c', "ac", 0, 0, &[], &counts)));
    }

    #[test]
    fn test_brink_trigger() {
        let counts = BTreeMap::new();
        let m = Mission::new(MissionKind::AuBordDuPrecipice);
        assert!(triggered(&m, &ctx('b', "ab", 9_500, 10_000, &[], &counts)));
        assert!(!triggered(&m, &ctx('b', "ab", 8_000, 10_000, &[], &counts)));
    }

    #[test]
    fn test_rare_letter_and_q_triggers() {
        let counts = BTreeMap::new();
        assert!(triggered(
            &Mission::new(MissionKind::CoupDuDictionnaire),
            &ctx('w', "aw", 0, 0, &[], &counts)
        ));
        assert!(triggered(
            &Mission::new(MissionKind::UnionForcee),
            &ctx('q', "aq", 0, 0, &[], &counts)
        ));
    }

    #[test]
    fn test_wire_roundtrip_and_unknown_id() {
        let m = Mission::from_wire("echo_parfait", 2).expect("known id");
        assert_eq!(m.kind, MissionKind::EchoParfait);
        assert_eq!(m.current_step, 2);
        assert!(Mission::from_wire("mission_inconnue", 0).is_none());
    }

    #[test]
    fn test_initial_missions_are_distinct() {
        let missions = initial_missions();
        assert_eq!(missions.len(), ACTIVE_MISSION_COUNT);
        for (i, a) in missions.iter().enumerate() {
            for b in &missions[i + 1..] {
                assert_ne!(a.kind, b.kind);
            }
        }
    }
}
