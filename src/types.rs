//! Game constants and record types shared across the crate.
//!
//! Every tunable of the turn protocol lives here so the calculator, the
//! turn controller, and the tests all read the same numbers.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Peer identifier: `"host:port"`, stable for the lifetime of a game.
pub type PeerId = String;

/// Reserved identifier for the single-peer AI opponent.
pub const COMPUTER_ID: &str = "computer";

/// Fixed listen port for every peer.
pub const LISTEN_PORT: u16 = 5000;

// =============================================================================
// TURN TIMING
// =============================================================================

/// Starting point of every timeout computation, in milliseconds.
pub const BASE_TIMEOUT_MS: i64 = 15_000;

/// Floor of the computed timeout. A turn is never shorter than this.
pub const MIN_TIMEOUT_MS: i64 = 3_000;

/// Ceiling of the computed timeout. A turn is never longer than this.
pub const MAX_TIMEOUT_MS: i64 = 60_000;

/// Response times under this reference earn a speed bonus; over it, a malus.
pub const SPEED_REFERENCE_MS: i64 = 5_000;

/// Multiplier applied to the speed delta.
pub const SPEED_BONUS_FACTOR: f64 = 1.5;

/// Flat bonus a vowel grants at full power.
pub const VOWEL_BONUS_MS: f64 = 7_500.0;

// =============================================================================
// VOWEL ECONOMY
// =============================================================================

/// The six letters treated as vowels by the whole game.
pub const VOWELS: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'y'];

/// Upper bound of any per-vowel power.
pub const MAX_VOWEL_POWER: f64 = 2.0;

/// Power regained by each spent vowel whenever a consonant is played.
pub const VOWEL_POWER_RECHARGE_RATE: f64 = 0.25;

// =============================================================================
// CURSES AND PADS
// =============================================================================

/// Plays of a single letter (since its last curse) that trigger escalation.
pub const CURSE_THRESHOLD: u32 = 3;

/// Maximum charge a phone-pad column can hold.
pub const PAD_CHARGE_THRESHOLD: u8 = 3;

/// Schema tag carried by every ball payload.
pub const BALL_SCHEMA_VERSION: u32 = 1;

pub fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c)
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Seconds since the Unix epoch, fractional.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

// =============================================================================
// TURN RECORDS
// =============================================================================

/// Intermediate values of one timeout computation, kept for observability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutLog {
    pub response_time_ms: i64,
    pub speed_bonus: f64,
    pub vowel_bonus: f64,
    pub base_timeout_ms: i64,
    pub cursed_malus: bool,
    pub pad_combo_malus: bool,
    /// Sum of base and bonuses after maluses, before clamping.
    pub raw_total: f64,
    pub final_timeout_ms: i64,
}

/// One committed turn of the current game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub player: PeerId,
    pub word: String,
    pub response_time_ms: i64,
    pub applied_modifiers: Vec<String>,
    pub timeout_log: TimeoutLog,
}

impl HistoryEntry {
    pub fn last_letter(&self) -> Option<char> {
        self.word.chars().last()
    }
}
