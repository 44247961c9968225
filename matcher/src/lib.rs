/*!
`quickmatch_matcher` is the low level crate that contains the fuzzy
matching and scoring primitives used by the `quickmatch` engine.

Matching is ASCII only: bytes outside the ASCII range still participate
(they simply never earn a bonus and are compared byte-for-byte), but there
is no Unicode normalization or case folding beyond ASCII. Needles and
haystacks are ordinary `&[u8]`.

The matcher holds reusable scratch memory so that scoring never allocates
on the hot path; a [`Matcher`] should be created once per worker thread and
reused across calls, not created per query.
*/

mod bonus;
mod config;
mod scalar;
mod simd;

pub use crate::bonus::{
    MATCH_MAX_LEN, SCORE_DISPLAY_MULTIPLIER, SCORE_MATCH_CONSECUTIVE, SCORE_MAX, SCORE_MIN,
};
pub use crate::config::MatcherConfig;

use crate::scalar::ScoreScratch;

/// Returns true once the feature probe has run; cached so repeated
/// [`Matcher::is_match`]/[`Matcher::score`] calls don't re-probe CPUID.
#[cfg(target_arch = "x86_64")]
fn has_sse2() -> bool {
    use std::sync::OnceLock;
    static DETECTED: OnceLock<bool> = OnceLock::new();
    *DETECTED.get_or_init(|| is_x86_feature_detected!("sse2"))
}

#[cfg(not(target_arch = "x86_64"))]
fn has_sse2() -> bool {
    false
}

/// A reusable ASCII fuzzy matcher and scorer.
///
/// Holds heap-allocated scratch rows sized for [`MATCH_MAX_LEN`]-byte
/// haystacks so that [`Matcher::score`] and [`Matcher::is_match`] never
/// allocate once warmed up. Cheap to keep one per worker thread; expensive
/// to create per call.
pub struct Matcher {
    pub config: MatcherConfig,
    scratch: ScoreScratch,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatcherConfig::DEFAULT)
    }
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Matcher {
            config,
            scratch: ScoreScratch::new(),
        }
    }

    /// Returns the byte offset of the first ordered-subsequence match of
    /// `needle` in `haystack`, or `None` if `needle` is not a subsequence.
    ///
    /// This is a cheap pre-filter: a `Some` result does not imply a high
    /// score, only that [`Matcher::score`] will return something finite.
    /// Prefers the SSE2 path when available and `haystack` fits within the
    /// matcher's configured length bound.
    pub fn is_match(&mut self, needle: &[u8], haystack: &[u8]) -> Option<usize> {
        if haystack.len() > self.config.max_haystack_len {
            return None;
        }
        #[cfg(target_arch = "x86_64")]
        if has_sse2() && haystack.len() <= MATCH_MAX_LEN {
            let padded = self.scratch.prepare_raw_haystack(haystack);
            let found = unsafe { simd::has_match(needle, padded) };
            return if found {
                scalar::is_match(needle, haystack)
            } else {
                None
            };
        }
        scalar::is_match(needle, haystack)
    }

    /// Scores `needle` against `haystack`.
    ///
    /// Returns [`SCORE_MIN`] if `needle` is not an ordered subsequence of
    /// `haystack`, or if `haystack` exceeds the matcher's configured length
    /// bound. Returns [`SCORE_MAX`] if `needle` and `haystack` are
    /// byte-for-byte (case-insensitive) equal. Dispatches to a
    /// needle-length-bucketed tiled scorer for short needles, falling back
    /// to the portable row-major dynamic program otherwise; the two are
    /// equivalent for every input. The tiled scorer has no architecture
    /// dependency (see [`scalar::score_tile`]'s doc comment), so this
    /// dispatch is a plain length match, not a CPU feature probe.
    pub fn score(&mut self, needle: &[u8], haystack: &[u8]) -> f32 {
        if haystack.len() > self.config.max_haystack_len {
            return bonus::SCORE_MIN;
        }
        match needle.len() {
            0 => bonus::SCORE_MIN,
            1 => scalar::score1(needle, haystack),
            2..=4 => scalar::score_tile_4(needle, haystack),
            5..=8 => scalar::score_tile_8(needle, haystack),
            9..=12 => scalar::score_tile_12(needle, haystack),
            13..=16 => scalar::score_tile_16(needle, haystack),
            _ => scalar::score(&mut self.scratch, needle, haystack),
        }
    }

    /// Scores `needle` against `haystack` and fills `positions` (which must
    /// be at least `needle.len()` long) with the matched byte offsets, in
    /// increasing order.
    ///
    /// Always uses the portable dynamic program, since backtracking needs
    /// the full score matrix rather than the tiled scorers' rolling rows.
    pub fn score_with_positions(
        &mut self,
        needle: &[u8],
        haystack: &[u8],
        positions: &mut [usize],
    ) -> f32 {
        if haystack.len() > self.config.max_haystack_len {
            return bonus::SCORE_MIN;
        }
        scalar::score_with_positions(needle, haystack, positions)
    }
}
