/// Configuration for a [`crate::Matcher`].
///
/// The upstream config this is adapted from also carries Unicode
/// normalization and casing knobs; this crate matches ASCII only (see the
/// crate docs), so those are dropped here.
#[non_exhaustive]
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Upper bound, in bytes, on haystacks handed to [`crate::Matcher`].
    /// Haystacks longer than this score as [`crate::bonus::SCORE_MIN`]
    /// rather than being rejected outright.
    pub max_haystack_len: usize,
}

impl MatcherConfig {
    pub const DEFAULT: Self = MatcherConfig {
        max_haystack_len: crate::bonus::MATCH_MAX_LEN,
    };
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
