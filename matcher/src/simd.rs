//! SIMD-accelerated fuzzy predicate.
//!
//! [`has_match`] ports `hasMatchSSE` with real SSE2 intrinsics: it is a
//! straightforward case-insensitive byte scan and carries no ambiguity in
//! its lane-select logic. The needle-length-bucketed tiled scorer lives in
//! [`crate::scalar::score_tile`] instead of here: its update rule streams
//! the haystack one byte at a time across all needle lanes, which is a
//! genuine restructuring of the D/M recurrence, but every lane's update
//! depends on the immediately preceding lane's result for the *same*
//! haystack byte (`m[k - 1]`, `d[k - 1]` above), a sequential
//! cross-lane dependency chain that real SIMD max/add lanes can't express
//! without per-step shuffles undoing any parallelism gained — so it has no
//! architecture dependency and belongs with the other portable code.

/// Case-insensitive ordered-subsequence scan over 16-byte chunks.
///
/// # Safety
/// `haystack` must have at least [`crate::scalar::PADDING`] bytes of valid,
/// readable memory immediately past `haystack.len()` (as provided by
/// [`crate::scalar::ScoreScratch::prepare_raw_haystack`]).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
pub unsafe fn has_match(needle: &[u8], haystack: &[u8]) -> bool {
    use std::arch::x86_64::*;

    if needle.is_empty() {
        return true;
    }
    if haystack.is_empty() {
        return false;
    }

    let base = haystack.as_ptr();
    let len = haystack.len() as isize;
    let mut off: isize = 0;
    let mut nit = 0usize;
    let mut needle_lo = needle[0].to_ascii_lowercase();

    loop {
        let chunk = _mm_loadu_si128(base.offset(off) as *const __m128i);
        let lower = simd_to_lower(chunk);
        let pattern = _mm_set1_epi8(needle_lo as i8);
        let eq = _mm_movemask_epi8(_mm_cmpeq_epi8(lower, pattern)) as u32;

        let remaining = len - off;
        let valid: u32 = if remaining >= 16 {
            0xFFFF
        } else {
            (1u32 << remaining) - 1
        };
        let mask = eq & valid;

        if mask != 0 {
            let pos = mask.trailing_zeros() as isize;
            off += pos + 1;
            nit += 1;
            if nit == needle.len() {
                return true;
            }
            needle_lo = needle[nit].to_ascii_lowercase();
            continue;
        }

        if remaining <= 16 {
            return false;
        }
        off += 16;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn simd_to_lower(r: std::arch::x86_64::__m128i) -> std::arch::x86_64::__m128i {
    use std::arch::x86_64::*;
    let offset = _mm_add_epi8(r, _mm_set1_epi8(63));
    let is_upper = _mm_cmpgt_epi8(_mm_set1_epi8(-102), offset);
    let add = _mm_and_si128(is_upper, _mm_set1_epi8(32));
    _mm_add_epi8(r, add)
}
