//! Portable (non-SIMD) fuzzy predicate and scorer.
//!
//! This is the reference implementation: every SIMD-accelerated path in
//! [`crate::simd`] must agree with it bit-for-bit on every valid input.

use crate::bonus::{
    bonus_for, precompute_bonus, to_lower_ascii, MATCH_MAX_LEN, SCORE_GAP_INNER,
    SCORE_GAP_LEADING, SCORE_GAP_TRAILING, SCORE_MATCH_CONSECUTIVE, SCORE_MAX, SCORE_MIN,
};

fn to_lower(ch: u8) -> u8 {
    ch.to_ascii_lowercase()
}

/// Case-insensitive ordered-subsequence test. Returns the haystack offset
/// of the first matched character on success.
pub fn is_match(needle: &[u8], haystack: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let mut n = needle.iter();
    let mut want = to_lower(*n.next().unwrap());
    let mut first = None;
    for (i, &ch) in haystack.iter().enumerate() {
        if to_lower(ch) == want {
            if first.is_none() {
                first = Some(i);
            }
            match n.next() {
                Some(&next) => want = to_lower(next),
                None => return first,
            }
        }
    }
    None
}

/// Trailing bytes of valid, zeroed memory kept past the live region of
/// [`ScoreScratch`]'s haystack-sized buffers, so [`crate::simd`] can read a
/// fixed-width chunk straddling the end of a short haystack without
/// touching unmapped memory.
pub const PADDING: usize = 64;

/// A pair of scratch rows (current/last) for the D/M dynamic program,
/// reused across calls to avoid per-query allocation. The haystack-sized
/// buffers are fixed at `MATCH_MAX_LEN + PADDING` and never shrunk, so a
/// padded, zero-filled tail is always available past the live region.
pub struct ScoreScratch {
    d: [Vec<f32>; 2],
    m: [Vec<f32>; 2],
    lower_needle: Vec<u8>,
    lower_haystack: Vec<u8>,
    raw_haystack: Vec<u8>,
    match_bonus: Vec<f32>,
}

impl ScoreScratch {
    pub fn new() -> Self {
        Self {
            d: [vec![0.0; MATCH_MAX_LEN], vec![0.0; MATCH_MAX_LEN]],
            m: [vec![0.0; MATCH_MAX_LEN], vec![0.0; MATCH_MAX_LEN]],
            lower_needle: vec![0; MATCH_MAX_LEN],
            lower_haystack: vec![0; MATCH_MAX_LEN + PADDING],
            raw_haystack: vec![0; MATCH_MAX_LEN + PADDING],
            match_bonus: vec![0.0; MATCH_MAX_LEN],
        }
    }

    fn prepare(&mut self, needle: &[u8], haystack: &[u8]) {
        debug_assert!(haystack.len() <= MATCH_MAX_LEN);
        if self.lower_needle.len() < needle.len() {
            self.lower_needle.resize(needle.len(), 0);
        }
        to_lower_ascii(needle, &mut self.lower_needle[..needle.len()]);
        to_lower_ascii(haystack, &mut self.lower_haystack[..haystack.len()]);
        self.lower_haystack[haystack.len()..haystack.len() + PADDING].fill(0);
        precompute_bonus(haystack, &mut self.match_bonus[..haystack.len()]);
    }

    /// Copies `haystack` into a buffer with at least [`PADDING`] valid,
    /// zeroed bytes beyond its end, for use by [`crate::simd::has_match`].
    pub fn prepare_raw_haystack(&mut self, haystack: &[u8]) -> &[u8] {
        debug_assert!(haystack.len() <= MATCH_MAX_LEN);
        self.raw_haystack[..haystack.len()].copy_from_slice(haystack);
        self.raw_haystack[haystack.len()..haystack.len() + PADDING].fill(0);
        &self.raw_haystack[..haystack.len()]
    }
}

impl Default for ScoreScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes one DP row. `row` is the needle row index; `gap_score` is the
/// inner or trailing gap penalty depending on whether this is the last row.
#[allow(clippy::too_many_arguments)]
fn match_row(
    row: usize,
    lower_needle: &[u8],
    lower_haystack: &[u8],
    match_bonus: &[f32],
    curr_d: &mut [f32],
    curr_m: &mut [f32],
    last_d: &[f32],
    last_m: &[f32],
    gap_score: f32,
) {
    let mut prev_score = SCORE_MIN;
    let needle_ch = lower_needle[row];
    for i in 0..lower_haystack.len() {
        if needle_ch == lower_haystack[i] {
            let score = if row == 0 {
                i as f32 * SCORE_GAP_LEADING + match_bonus[i]
            } else if i > 0 {
                (last_m[i - 1] + match_bonus[i]).max(last_d[i - 1] + SCORE_MATCH_CONSECUTIVE)
            } else {
                SCORE_MIN
            };
            curr_d[i] = score;
            prev_score = score.max(prev_score + gap_score);
            curr_m[i] = prev_score;
        } else {
            curr_d[i] = SCORE_MIN;
            prev_score += gap_score;
            curr_m[i] = prev_score;
        }
    }
}

/// Single-character needle fast path: O(haystack length), no row buffers.
pub fn score1(needle: &[u8], haystack: &[u8]) -> f32 {
    debug_assert_eq!(needle.len(), 1);
    if haystack.is_empty() || haystack.len() > MATCH_MAX_LEN {
        return SCORE_MIN;
    }
    if haystack.len() == 1 {
        return SCORE_MAX;
    }
    let lower_needle = to_lower(needle[0]);
    let mut last = b'/';
    let mut score = SCORE_MIN;
    if to_lower(haystack[0]) == lower_needle {
        score = bonus_for(haystack[0], last);
    }
    last = haystack[0];
    for (i, &ch) in haystack.iter().enumerate().skip(1) {
        score += SCORE_GAP_TRAILING;
        if to_lower(ch) == lower_needle {
            let candidate = i as f32 * SCORE_GAP_LEADING + bonus_for(ch, last);
            if candidate > score {
                score = candidate;
            }
        }
        last = ch;
    }
    score
}

/// Scores `needle` against `haystack` assuming [`is_match`] already
/// returned `Some`. Both must be no longer than [`MATCH_MAX_LEN`].
pub fn score(scratch: &mut ScoreScratch, needle: &[u8], haystack: &[u8]) -> f32 {
    if needle.is_empty() {
        return SCORE_MIN;
    }
    if haystack.len() > MATCH_MAX_LEN || needle.len() > haystack.len() {
        return SCORE_MIN;
    }
    if needle.len() == haystack.len() {
        return SCORE_MAX;
    }
    if needle.len() == 1 {
        return score1(needle, haystack);
    }

    scratch.prepare(needle, haystack);
    let hlen = haystack.len();
    let (mut last_d, mut curr_d) = (0usize, 1usize);
    let (mut last_m, mut curr_m) = (0usize, 1usize);

    for row in 0..needle.len() {
        let gap_score = if row == needle.len() - 1 {
            SCORE_GAP_TRAILING
        } else {
            SCORE_GAP_INNER
        };
        let (d0, d1) = scratch.d.split_at_mut(1);
        let (m0, m1) = scratch.m.split_at_mut(1);
        let (curr_d_slice, last_d_slice): (&mut [f32], &[f32]) = if curr_d == 0 {
            (&mut d0[0][..hlen], &d1[0][..hlen])
        } else {
            (&mut d1[0][..hlen], &d0[0][..hlen])
        };
        let (curr_m_slice, last_m_slice): (&mut [f32], &[f32]) = if curr_m == 0 {
            (&mut m0[0][..hlen], &m1[0][..hlen])
        } else {
            (&mut m1[0][..hlen], &m0[0][..hlen])
        };
        match_row(
            row,
            &scratch.lower_needle[..needle.len()],
            &scratch.lower_haystack[..hlen],
            &scratch.match_bonus[..hlen],
            curr_d_slice,
            curr_m_slice,
            last_d_slice,
            last_m_slice,
            gap_score,
        );
        std::mem::swap(&mut curr_d, &mut last_d);
        std::mem::swap(&mut curr_m, &mut last_m);
    }

    scratch.m[last_m][hlen - 1]
}

/// Scores `needle` (length ≤ `N`) against `haystack`, holding all `N`
/// needle lanes "in flight" and streaming one haystack byte at a time
/// instead of looping row-by-row like [`score`] does. Equivalent by
/// construction to [`score`]'s row-major D/M recurrence: lane `k` here
/// plays the role of needle row `k`, and each step consumes only the
/// *previous column's* values for lanes `k` and `k - 1`, exactly
/// mirroring the scalar recurrence's dependence on `lastD`/`lastM` (row
/// `k - 1`) and the running `prevScore` (row `k`, column `i - 1`).
///
/// Despite the name, this has no architecture dependency: lane `k`'s
/// update reads lane `k - 1`'s *freshly computed* value for the same
/// haystack byte, a sequential cross-lane chain that real SIMD max/add
/// instructions can't express without a shuffle per step, which would
/// cost more than it saves. It lives here rather than in
/// [`crate::simd`] because of that — the restructuring is real, the
/// acceleration isn't.
pub fn score_tile<const N: usize>(needle: &[u8], haystack: &[u8]) -> f32 {
    debug_assert!(needle.len() <= N);
    if needle.is_empty() {
        return SCORE_MIN;
    }
    if haystack.len() > MATCH_MAX_LEN || needle.len() > haystack.len() {
        return SCORE_MIN;
    }
    if needle.len() == haystack.len() {
        return SCORE_MAX;
    }

    let needle_len = needle.len();
    let mut lower_needle = [0u8; N];
    for (i, &b) in needle.iter().enumerate() {
        lower_needle[i] = b.to_ascii_lowercase();
    }

    let mut d = [SCORE_MIN; N];
    let mut m = [SCORE_MIN; N];
    let last_lane = needle_len - 1;
    let mut last_ch = b'/';

    for (i, &ch) in haystack.iter().enumerate() {
        let bonus = bonus_for(ch, last_ch);
        last_ch = ch;
        let lower_ch = ch.to_ascii_lowercase();

        let mut new_d = [SCORE_MIN; N];
        let mut new_m = [SCORE_MIN; N];
        for k in 0..needle_len {
            let gap = if k == last_lane {
                SCORE_GAP_TRAILING
            } else {
                SCORE_GAP_INNER
            };
            if lower_needle[k] == lower_ch {
                let score = if k == 0 {
                    i as f32 * SCORE_GAP_LEADING + bonus
                } else {
                    (m[k - 1] + bonus).max(d[k - 1] + SCORE_MATCH_CONSECUTIVE)
                };
                new_d[k] = score;
                new_m[k] = score.max(m[k] + gap);
            } else {
                new_d[k] = SCORE_MIN;
                new_m[k] = m[k] + gap;
            }
        }
        d = new_d;
        m = new_m;
    }

    m[last_lane]
}

pub fn score_tile_4(needle: &[u8], haystack: &[u8]) -> f32 {
    score_tile::<4>(needle, haystack)
}
pub fn score_tile_8(needle: &[u8], haystack: &[u8]) -> f32 {
    score_tile::<8>(needle, haystack)
}
pub fn score_tile_12(needle: &[u8], haystack: &[u8]) -> f32 {
    score_tile::<12>(needle, haystack)
}
pub fn score_tile_16(needle: &[u8], haystack: &[u8]) -> f32 {
    score_tile::<16>(needle, haystack)
}

/// Scores `needle` against `haystack` and fills `positions` (must have
/// length `needle.len()`) with the 0-based haystack offsets contributing
/// to the optimal alignment.
pub fn score_with_positions(needle: &[u8], haystack: &[u8], positions: &mut [usize]) -> f32 {
    debug_assert_eq!(positions.len(), needle.len());
    if needle.is_empty() {
        return SCORE_MIN;
    }
    if haystack.len() > MATCH_MAX_LEN || needle.len() > haystack.len() {
        return SCORE_MIN;
    }
    if needle.len() == haystack.len() {
        for (i, p) in positions.iter_mut().enumerate() {
            *p = i;
        }
        return SCORE_MAX;
    }

    let mut lower_needle = vec![0u8; needle.len()];
    let mut lower_haystack = vec![0u8; haystack.len()];
    let mut match_bonus = vec![0.0f32; haystack.len()];
    to_lower_ascii(needle, &mut lower_needle);
    to_lower_ascii(haystack, &mut lower_haystack);
    precompute_bonus(haystack, &mut match_bonus);

    let needle_len = needle.len();
    let hlen = haystack.len();
    let mut d = vec![vec![0.0f32; hlen]; needle_len];
    let mut m = vec![vec![0.0f32; hlen]; needle_len];

    for row in 0..needle_len {
        let gap_score = if row == needle_len - 1 {
            SCORE_GAP_TRAILING
        } else {
            SCORE_GAP_INNER
        };
        if row == 0 {
            let (curr_d, rest) = d.split_first_mut().unwrap();
            let (curr_m, _) = m.split_first_mut().unwrap();
            let _ = rest;
            match_row(
                row,
                &lower_needle,
                &lower_haystack,
                &match_bonus,
                curr_d,
                curr_m,
                &[],
                &[],
                gap_score,
            );
        } else {
            let (prev, curr) = d.split_at_mut(row);
            let last_d = &prev[row - 1];
            let curr_d = &mut curr[0];
            let (prev_m, curr_m_slice) = m.split_at_mut(row);
            let last_m = &prev_m[row - 1];
            let curr_m = &mut curr_m_slice[0];
            match_row(
                row,
                &lower_needle,
                &lower_haystack,
                &match_bonus,
                curr_d,
                curr_m,
                last_d,
                last_m,
                gap_score,
            );
        }
    }

    let mut match_required = false;
    let mut j = hlen as isize - 1;
    for i in (0..needle_len as isize).rev() {
        while j >= 0 {
            let jj = j as usize;
            let ii = i as usize;
            if d[ii][jj] != SCORE_MIN && (match_required || d[ii][jj] == m[ii][jj]) {
                match_required =
                    ii > 0 && jj > 0 && m[ii][jj] == d[ii - 1][jj - 1] + SCORE_MATCH_CONSECUTIVE;
                positions[ii] = jj;
                j -= 1;
                break;
            }
            j -= 1;
        }
    }

    m[needle_len - 1][hlen - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_infinite() {
        let mut s = ScoreScratch::new();
        assert_eq!(score(&mut s, b"foo", b"foo"), SCORE_MAX);
    }

    #[test]
    fn needle_longer_than_haystack_is_negative_infinite() {
        let mut s = ScoreScratch::new();
        assert_eq!(score(&mut s, b"foobar", b"foo"), SCORE_MIN);
    }

    #[test]
    fn consecutive_beats_scattered() {
        let mut s = ScoreScratch::new();
        let a = score(&mut s, b"amo", b"app/models/foo");
        let b = score(&mut s, b"amo", b"app/m/foo");
        assert!(a > b, "{a} should be greater than {b}");
    }

    #[test]
    fn word_boundary_preference() {
        let mut s = ScoreScratch::new();
        let a = score(&mut s, b"amor", b"app/models/order");
        let b = score(&mut s, b"amor", b"app/models/zrder");
        assert!(a > b);
    }

    #[test]
    fn backtrack_identical_strings() {
        let mut positions = [0usize; 3];
        let s = score_with_positions(b"foo", b"foo", &mut positions);
        assert_eq!(s, SCORE_MAX);
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn backtrack_positions_strictly_increasing() {
        let needle = b"amor";
        let haystack = b"app/models/order";
        let mut positions = [0usize; 4];
        let s = score_with_positions(needle, haystack, &mut positions);
        assert!(s.is_finite());
        for w in positions.windows(2) {
            assert!(w[0] < w[1]);
        }
        for (i, &p) in positions.iter().enumerate() {
            assert_eq!(
                haystack[p].to_ascii_lowercase(),
                needle[i].to_ascii_lowercase()
            );
        }
        // "a" at the start of "app", "m" at the start of "models", "o" at
        // the start of "order", and "r" consecutively right after it (the
        // word's second letter, not its own boundary start — the
        // consecutive-match bonus outweighs waiting for "order"'s trailing
        // "r").
        assert_eq!(positions, [0, 4, 11, 12]);
    }

    #[test]
    fn tiled_scorer_matches_scalar_reference() {
        let mut scratch = ScoreScratch::new();
        let cases: &[(&[u8], &[u8])] = &[
            (b"amo", b"app/models/foo"),
            (b"amor", b"app/models/order"),
            (b"ab", b"aabbcc"),
            (b"test", b"TestFile.rs"),
            (b"xyz1234567890abc", b"xyz1234567890abcdef"),
        ];
        for &(needle, haystack) in cases {
            let expected = score(&mut scratch, needle, haystack);
            let got = match needle.len() {
                1 => score1(needle, haystack),
                2..=4 => score_tile_4(needle, haystack),
                5..=8 => score_tile_8(needle, haystack),
                9..=12 => score_tile_12(needle, haystack),
                13..=16 => score_tile_16(needle, haystack),
                _ => continue,
            };
            assert_eq!(expected, got, "needle={needle:?} haystack={haystack:?}");
        }
    }

    #[test]
    fn single_char_matches_generic_path() {
        let mut s = ScoreScratch::new();
        for haystack in [&b"a"[..], b"banana", b"AAAA", b"xyzabc123"] {
            if is_match(b"a", haystack).is_some() {
                let generic = score(&mut s, b"a", haystack);
                let fast = score1(b"a", haystack);
                assert_eq!(generic, fast, "haystack={haystack:?}");
            }
        }
    }

    #[test]
    fn predicate_returns_first_match_offset() {
        assert_eq!(is_match(b"br", b"bar bar"), Some(0));
        assert_eq!(is_match(b"br", b"a bar"), Some(2));
        assert_eq!(is_match(b"xyz", b"hello"), None);
    }
}
