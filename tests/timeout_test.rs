//! Property suite for the timeout calculator.

use proptest::prelude::*;
use std::collections::BTreeMap;
use wordball::timeout::calculate_next_timeout;
use wordball::types::{MAX_TIMEOUT_MS, MAX_VOWEL_POWER, MIN_TIMEOUT_MS, VOWELS};

fn unit_powers() -> BTreeMap<char, f64> {
    VOWELS.iter().map(|v| (*v, 1.0)).collect()
}

fn arbitrary_powers() -> impl Strategy<Value = BTreeMap<char, f64>> {
    prop::collection::vec(0.0f64..=MAX_VOWEL_POWER, VOWELS.len())
        .prop_map(|values| VOWELS.iter().copied().zip(values).collect())
}

proptest! {
    #[test]
    fn final_timeout_always_within_bounds(
        response_time_ms in -120_000i64..240_000,
        letter in proptest::char::range('a', 'z'),
        powers in arbitrary_powers(),
        cursed in any::<bool>(),
        combo in any::<bool>(),
    ) {
        let word = format!("wor{}", letter);
        let out = calculate_next_timeout(response_time_ms, &word, &powers, cursed, combo);
        prop_assert!(out.final_timeout_ms >= MIN_TIMEOUT_MS);
        prop_assert!(out.final_timeout_ms <= MAX_TIMEOUT_MS);
    }

    #[test]
    fn calculator_is_pure(
        response_time_ms in -120_000i64..240_000,
        letter in proptest::char::range('a', 'z'),
        powers in arbitrary_powers(),
        cursed in any::<bool>(),
        combo in any::<bool>(),
    ) {
        let word = format!("wor{}", letter);
        let first = calculate_next_timeout(response_time_ms, &word, &powers, cursed, combo);
        let second = calculate_next_timeout(response_time_ms, &word, &powers, cursed, combo);
        prop_assert_eq!(first.final_timeout_ms, second.final_timeout_ms);
        prop_assert_eq!(first.tags, second.tags);
        prop_assert_eq!(first.vowel_powers, second.vowel_powers);
    }

    #[test]
    fn vowel_powers_stay_within_bounds(
        response_time_ms in -120_000i64..240_000,
        letter in proptest::char::range('a', 'z'),
        powers in arbitrary_powers(),
    ) {
        let word = format!("wor{}", letter);
        let out = calculate_next_timeout(response_time_ms, &word, &powers, false, false);
        for power in out.vowel_powers.values() {
            prop_assert!(*power >= 0.0);
            prop_assert!(*power <= MAX_VOWEL_POWER);
        }
    }
}

#[test]
fn test_tags_follow_algorithm_order() {
    let out = calculate_next_timeout(2_000, "ba", &unit_powers(), true, false);
    assert_eq!(out.tags, vec!["voyelle (100%)", "maudite", "vitesse"]);
    assert_eq!(out.final_timeout_ms, MIN_TIMEOUT_MS);
}

#[test]
fn test_log_carries_every_intermediate() {
    let out = calculate_next_timeout(8_000, "ab", &unit_powers(), false, true);
    assert_eq!(out.log.response_time_ms, 8_000);
    assert_eq!(out.log.speed_bonus, -4_500.0);
    assert_eq!(out.log.vowel_bonus, 0.0);
    assert!(out.log.pad_combo_malus);
    assert!(!out.log.cursed_malus);
    assert_eq!(out.log.final_timeout_ms, out.final_timeout_ms);
}
