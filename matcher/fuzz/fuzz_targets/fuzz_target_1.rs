#![no_main]

use libfuzzer_sys::fuzz_target;
use quickmatch_matcher::Matcher;

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (needle, haystack) = input;
    let mut matcher = Matcher::default();
    if let Some(offset) = matcher.is_match(&needle, &haystack) {
        assert!(offset <= haystack.len());
        let score = matcher.score(&needle, &haystack);
        assert!(!score.is_nan());
        if needle.len() <= 16 {
            let mut positions = vec![0usize; needle.len()];
            matcher.score_with_positions(&needle, &haystack, &mut positions);
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
});
