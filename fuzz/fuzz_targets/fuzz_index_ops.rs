#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use toknav::index::{DocId, TokenIndex};

const PATTERNS: [&str; 3] = [r"\w+", r"[a-z]+", r"\S+"];

#[derive(Debug, Arbitrary)]
enum Op {
    Scan { doc: u8, text: String, pattern: u8, force: bool },
    Detach { doc: u8 },
    Reload,
}

fuzz_target!(|ops: Vec<Op>| {
    // Arbitrary scan/detach/reload sequences must keep the maps in agreement
    let mut index = TokenIndex::new(4);

    for op in ops {
        match op {
            Op::Scan { doc, text, pattern, force } => {
                let doc = DocId::new(format!("fuzz://{}", doc % 8));
                let pattern = PATTERNS[pattern as usize % PATTERNS.len()];
                let _ = index.scan(&doc, &text, pattern, force);
            }
            Op::Detach { doc } => {
                index.detach(&DocId::new(format!("fuzz://{}", doc % 8)));
            }
            Op::Reload => index.reload(),
        }

        assert!(index.doc_count() <= 4);
        if let Err(e) = index.check_consistency() {
            panic!("inconsistent index: {e}");
        }
    }
});
