//! Next-timeout calculator.
//!
//! Pure policy: the same inputs always yield the same timeout, tag list, and
//! vowel-power update. The caller owns persistence of the returned powers and
//! the history record built from the log.

use crate::types::{
    BASE_TIMEOUT_MS, MAX_TIMEOUT_MS, MAX_VOWEL_POWER, MIN_TIMEOUT_MS, SPEED_BONUS_FACTOR,
    SPEED_REFERENCE_MS, TimeoutLog, VOWEL_BONUS_MS, VOWEL_POWER_RECHARGE_RATE, VOWELS, is_vowel,
};
use std::collections::BTreeMap;

/// Result of one timeout computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutOutcome {
    pub final_timeout_ms: i64,
    pub tags: Vec<String>,
    /// Updated vowel powers for the player who just moved.
    pub vowel_powers: BTreeMap<char, f64>,
    pub log: TimeoutLog,
}

/// Compute the next turn's timeout from the move just committed.
///
/// A vowel spends its power for a large bonus and halves it; a consonant
/// recharges every spent vowel. Curse and pad-combo maluses quarter and halve
/// the total respectively. The result is clamped to
/// `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`.
pub fn calculate_next_timeout(
    response_time_ms: i64,
    new_word: &str,
    vowel_powers: &BTreeMap<char, f64>,
    cursed_malus: bool,
    pad_combo_malus: bool,
) -> TimeoutOutcome {
    let mut tags = Vec::new();
    let mut powers = vowel_powers.clone();

    let speed_bonus = (SPEED_REFERENCE_MS - response_time_ms) as f64 * SPEED_BONUS_FACTOR;
    let letter = new_word.chars().last().unwrap_or_default();

    let vowel_bonus = if is_vowel(letter) {
        let power = powers.get(&letter).copied().unwrap_or(1.0);
        powers.insert(letter, power / 2.0);
        tags.push(format!("voyelle ({:.0}%)", power * 100.0));
        -VOWEL_BONUS_MS * power
    } else {
        let mut recharged = false;
        for v in VOWELS {
            let power = powers.entry(v).or_insert(1.0);
            if *power < MAX_VOWEL_POWER {
                *power = (*power + VOWEL_POWER_RECHARGE_RATE).min(MAX_VOWEL_POWER);
                recharged = true;
            }
        }
        if recharged {
            tags.push("recharge".to_string());
        }
        0.0
    };

    let mut total = BASE_TIMEOUT_MS as f64 + speed_bonus + vowel_bonus;
    if cursed_malus {
        total *= 0.25;
        tags.push("maudite".to_string());
    }
    if pad_combo_malus {
        total *= 0.5;
        tags.push("combo #".to_string());
    }
    if speed_bonus > 0.0 {
        tags.push("vitesse".to_string());
    }

    let final_timeout_ms = total
        .round()
        .clamp(MIN_TIMEOUT_MS as f64, MAX_TIMEOUT_MS as f64) as i64;

    let log = TimeoutLog {
        response_time_ms,
        speed_bonus,
        vowel_bonus,
        base_timeout_ms: BASE_TIMEOUT_MS,
        cursed_malus,
        pad_combo_malus,
        raw_total: total,
        final_timeout_ms,
    };

    TimeoutOutcome { final_timeout_ms, tags, vowel_powers: powers, log }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_powers() -> BTreeMap<char, f64> {
        VOWELS.iter().map(|v| (*v, 1.0)).collect()
    }

    #[test]
    fn test_slow_consonant() {
        let out = calculate_next_timeout(8_000, "ab", &full_powers(), false, false);
        assert_eq!(out.final_timeout_ms, 10_500);
        assert_eq!(out.tags, vec!["recharge"]);
        for v in VOWELS {
            assert_eq!(out.vowel_powers[&v], 1.25);
        }
    }

    #[test]
    fn test_vowel_at_full_power() {
        let out = calculate_next_timeout(2_000, "ba", &full_powers(), false, false);
        assert_eq!(out.final_timeout_ms, 12_000);
        assert!(out.tags.contains(&"voyelle (100%)".to_string()));
        assert!(out.tags.contains(&"vitesse".to_string()));
        assert_eq!(out.vowel_powers[&'a'], 0.5);
    }

    #[test]
    fn test_cursed_malus_quarters() {
        let out = calculate_next_timeout(2_000, "ba", &full_powers(), true, false);
        assert_eq!(out.final_timeout_ms, 3_000);
        assert!(out.tags.contains(&"maudite".to_string()));
    }

    #[test]
    fn test_pad_combo_malus_halves() {
        let out = calculate_next_timeout(8_000, "ab", &full_powers(), false, true);
        // 15000 - 4500 = 10500, halved to 5250.
        assert_eq!(out.final_timeout_ms, 5_250);
        assert!(out.tags.contains(&"combo #".to_string()));
    }

    #[test]
    fn test_no_recharge_at_max_power() {
        let powers: BTreeMap<char, f64> = VOWELS.iter().map(|v| (*v, MAX_VOWEL_POWER)).collect();
        let out = calculate_next_timeout(5_000, "ab", &powers, false, false);
        assert!(out.tags.is_empty());
        for v in VOWELS {
            assert_eq!(out.vowel_powers[&v], MAX_VOWEL_POWER);
        }
    }

    #[test]
    fn test_spent_vowel_gives_smaller_bonus() {
        let mut powers = full_powers();
        powers.insert('a', 0.5);
        let out = calculate_next_timeout(5_000, "ba", &powers, false, false);
        // 15000 + 0 - 7500 * 0.5 = 11250.
        assert_eq!(out.final_timeout_ms, 11_250);
        assert!(out.tags.contains(&"voyelle (50%)".to_string()));
        assert_eq!(out.vowel_powers[&'a'], 0.25);
    }

    #[test]
    fn test_clamped_to_bounds() {
        // Huge response time drags the total below the floor.
        let slow = calculate_next_timeout(120_000, "ab", &full_powers(), false, false);
        assert_eq!(slow.final_timeout_ms, MIN_TIMEOUT_MS);
        // Instant answer with clock skew exceeds the ceiling.
        let fast = calculate_next_timeout(-60_000, "ab", &full_powers(), false, false);
        assert_eq!(fast.final_timeout_ms, MAX_TIMEOUT_MS);
    }
}
