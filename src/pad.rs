//! Phone-pad charge accumulator: letter-to-column mapping and combo keys.
//!
//! Each letter maps onto its phone keypad digit ('2'..'9'). Playing a letter
//! charges its column; combos spend charge across a fixed set of columns.

use std::collections::BTreeMap;

/// The eight letter-bearing keypad digits.
pub const PAD_DIGITS: [char; 8] = ['2', '3', '4', '5', '6', '7', '8', '9'];

/// Letters printed on a keypad digit.
pub fn pad_letters(digit: char) -> &'static str {
    match digit {
        '2' => "abc",
        '3' => "def",
        '4' => "ghi",
        '5' => "jkl",
        '6' => "mno",
        '7' => "pqrs",
        '8' => "tuv",
        '9' => "wxyz",
        _ => "",
    }
}

/// Keypad digit carrying the given letter.
pub fn letter_to_pad(letter: char) -> Option<char> {
    PAD_DIGITS
        .iter()
        .copied()
        .find(|d| pad_letters(*d).contains(letter))
}

/// The three bottom-row combo keys.
///
/// Each key spends the columns above it on the keypad; digit 1 carries no
/// letters, so the `*` key works over the two chargeable digits of its
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboKey {
    /// Purge: clears all cursed letters.
    Star,
    /// Recharge: restores all vowel powers to the maximum.
    Zero,
    /// Attack: blocks the next holder on the letters of the spent columns.
    Hash,
}

impl ComboKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "*" => Some(Self::Star),
            "0" => Some(Self::Zero),
            "#" => Some(Self::Hash),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Star => '*',
            Self::Zero => '0',
            Self::Hash => '#',
        }
    }

    /// Columns this key spends.
    pub fn columns(&self) -> &'static [char] {
        match self {
            Self::Star => &['4', '7'],
            Self::Zero => &['2', '5', '8'],
            Self::Hash => &['3', '6', '9'],
        }
    }

    /// Letters of the spent columns, used by the Attack inability.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.columns().iter().flat_map(|d| pad_letters(*d).chars())
    }
}

/// A combo is available once every column of its set holds charge.
pub fn combo_available(pad: &BTreeMap<char, u8>, key: ComboKey) -> bool {
    key.columns()
        .iter()
        .all(|d| pad.get(d).copied().unwrap_or(0) >= 1)
}

/// The power-up needs charge in every column.
pub fn power_up_available(pad: &BTreeMap<char, u8>) -> bool {
    PAD_DIGITS.iter().all(|d| pad.get(d).copied().unwrap_or(0) >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_with(charged: &[char]) -> BTreeMap<char, u8> {
        let mut pad: BTreeMap<char, u8> = PAD_DIGITS.iter().map(|d| (*d, 0)).collect();
        for d in charged {
            pad.insert(*d, 1);
        }
        pad
    }

    #[test]
    fn test_letter_mapping() {
        assert_eq!(letter_to_pad('a'), Some('2'));
        assert_eq!(letter_to_pad('s'), Some('7'));
        assert_eq!(letter_to_pad('z'), Some('9'));
        assert_eq!(letter_to_pad('é'), None);
    }

    #[test]
    fn test_combo_availability() {
        assert!(combo_available(&pad_with(&['4', '7']), ComboKey::Star));
        assert!(!combo_available(&pad_with(&['4']), ComboKey::Star));
        assert!(combo_available(&pad_with(&['2', '5', '8']), ComboKey::Zero));
        assert!(!combo_available(&pad_with(&['2', '5']), ComboKey::Zero));
    }

    #[test]
    fn test_power_up_needs_every_column() {
        assert!(!power_up_available(&pad_with(&['2', '3', '4'])));
        assert!(power_up_available(&pad_with(&PAD_DIGITS)));
    }

    #[test]
    fn test_attack_letters() {
        let letters: Vec<char> = ComboKey::Hash.letters().collect();
        assert_eq!(letters, "defmnowxyz".chars().collect::<Vec<_>>());
    }
}
