#![no_main]

use libfuzzer_sys::fuzz_target;
use quickmatch::Items;

fuzz_target!(|strings: Vec<Vec<u8>>| {
    let mut items = Items::new();
    let mut expected = Vec::new();
    for s in &strings {
        if items.push(s).is_ok() && !s.is_empty() {
            expected.push(s.clone());
        }
    }
    assert_eq!(items.size(), expected.len());
    for (i, s) in expected.iter().enumerate() {
        assert_eq!(items.at(i), s.as_slice());
    }
});
