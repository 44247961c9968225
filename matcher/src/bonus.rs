//! ASCII bonus table and score constants for the fuzzy scorer.
//!
//! Scores are kept as integer-valued `f32`s scaled by 200 so the dynamic
//! program never needs fractional arithmetic for the lengths this crate
//! supports; multiply by [`SCORE_DISPLAY_MULTIPLIER`] to get a human scale
//! back.

/// Score gained for matching the first character against the leading edge
/// of the haystack, per skipped byte.
pub const SCORE_GAP_LEADING: f32 = -1.0;
/// Score lost per trailing (unmatched tail) byte in the last needle row.
pub const SCORE_GAP_TRAILING: f32 = -1.0;
/// Score lost per byte skipped between two matched characters in inner rows.
pub const SCORE_GAP_INNER: f32 = -2.0;
/// Bonus for two consecutive matched characters (replaces, doesn't stack
/// with, the positional bonus).
pub const SCORE_MATCH_CONSECUTIVE: f32 = 200.0;
/// Bonus for a match immediately after a path separator.
pub const SCORE_MATCH_SLASH: f32 = 180.0;
/// Bonus for a match immediately after `-`, `_` or a space.
pub const SCORE_MATCH_WORD: f32 = 160.0;
/// Bonus for an uppercase match immediately after a lowercase letter.
pub const SCORE_MATCH_CAPITAL: f32 = 140.0;
/// Bonus for a match immediately after `.`.
pub const SCORE_MATCH_DOT: f32 = 120.0;

/// Scales a raw internal score back to a human-comparable value.
pub const SCORE_DISPLAY_MULTIPLIER: f32 = 0.005;

pub const SCORE_MAX: f32 = f32::INFINITY;
pub const SCORE_MIN: f32 = f32::NEG_INFINITY;

/// Upper bound on haystack length handled by the scorer; see
/// [`crate::Matcher`] for what happens past this bound.
pub const MATCH_MAX_LEN: usize = 1024;

fn to_lower(ch: u8) -> u8 {
    ch.wrapping_add(if ch.is_ascii_uppercase() { 32 } else { 0 })
}

/// Bonus class of a haystack byte: 0 = none, 1 = lowercase/digit, 2 = uppercase.
fn bonus_index(ch: u8) -> u8 {
    if ch.is_ascii_uppercase() {
        2
    } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
        1
    } else {
        0
    }
}

/// Bonus granted for matching at `ch`, given the class of the preceding
/// haystack byte `prev` (the byte before index 0 is treated as `/`).
pub fn bonus_for(ch: u8, prev: u8) -> f32 {
    match bonus_index(ch) {
        1 => match prev {
            b'/' => SCORE_MATCH_SLASH,
            b'-' | b'_' | b' ' => SCORE_MATCH_WORD,
            b'.' => SCORE_MATCH_DOT,
            _ => 0.0,
        },
        2 => match prev {
            b'/' => SCORE_MATCH_SLASH,
            b'-' | b'_' | b' ' => SCORE_MATCH_WORD,
            b'.' => SCORE_MATCH_DOT,
            b'a'..=b'z' => SCORE_MATCH_CAPITAL,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Fills `bonus[i]` with [`bonus_for`]`(haystack[i], prev)` for every byte
/// of `haystack`, where `prev` is the preceding haystack byte (or `/`).
pub fn precompute_bonus(haystack: &[u8], bonus: &mut [f32]) {
    let mut last = b'/';
    for (i, &ch) in haystack.iter().enumerate() {
        bonus[i] = bonus_for(ch, last);
        last = ch;
    }
}

/// Lowercases `src` into `dst`, which must be at least `src.len()` long.
pub fn to_lower_ascii(src: &[u8], dst: &mut [u8]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = to_lower(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonus_capital_requires_lowercase_predecessor() {
        assert_eq!(bonus_for(b'M', b'a'), SCORE_MATCH_CAPITAL);
        assert_eq!(bonus_for(b'M', b'/'), SCORE_MATCH_SLASH);
        assert_eq!(bonus_for(b'M', b'A'), 0.0);
    }

    #[test]
    fn bonus_word_boundary_chars() {
        for sep in [b'-', b'_', b' '] {
            assert_eq!(bonus_for(b'a', sep), SCORE_MATCH_WORD);
        }
        assert_eq!(bonus_for(b'a', b'.'), SCORE_MATCH_DOT);
        assert_eq!(bonus_for(b'a', b'/'), SCORE_MATCH_SLASH);
    }

    #[test]
    fn non_alnum_haystack_byte_has_no_bonus_class() {
        assert_eq!(bonus_for(b'/', b'/'), 0.0);
        assert_eq!(bonus_for(b' ', b'a'), 0.0);
    }
}
