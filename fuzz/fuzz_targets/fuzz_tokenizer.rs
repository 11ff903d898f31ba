#![no_main]

use libfuzzer_sys::fuzz_target;
use toknav::utils::{LineIndex, PatternCache, extract_hits, line_text};

fuzz_target!(|text: &str| {
    // Every hit must resolve to a line that contains it
    let mut patterns = PatternCache::new();
    let Ok(pattern) = patterns.get(r"\w+") else {
        return;
    };

    let lines = LineIndex::new(text);
    for (token, offset) in extract_hits(pattern, text) {
        let (line, column) = lines.position(offset);
        let row = line_text(text, line);
        assert!(row.chars().skip(column).collect::<String>().starts_with(token));
    }
});
