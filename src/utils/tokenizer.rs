use memchr::memchr_iter;
use regex::Regex;
use rustc_hash::FxHashMap;

/// Cache of compiled token patterns keyed by their source text.
///
/// Patterns come from configuration per document language, so the same few
/// sources are compiled over and over during a workspace scan.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: FxHashMap<String, Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source`, or return the cached regex.
    pub fn get(&mut self, source: &str) -> Result<&Regex, regex::Error> {
        if !self.compiled.contains_key(source) {
            let regex = Regex::new(source)?;
            self.compiled.insert(source.to_string(), regex);
        }
        // Inserted above when missing
        Ok(&self.compiled[source])
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Run `pattern` over `text`, returning every non-empty match with its
/// character offset, in left-to-right order.
pub fn extract_hits<'t>(pattern: &Regex, text: &'t str) -> Vec<(&'t str, usize)> {
    let mut hits = Vec::new();
    let mut last_byte = 0;
    let mut last_char = 0;

    for m in pattern.find_iter(text) {
        if m.is_empty() {
            continue;
        }
        // Matches are ordered, so char offsets can be counted incrementally
        last_char += text[last_byte..m.start()].chars().count();
        last_byte = m.start();
        hits.push((m.as_str(), last_char));
    }

    hits
}

/// Byte position of the `char_offset`-th character (clamped to the text end).
pub fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Maps character offsets to zero-based (line, column) pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Character offset at which each line starts
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut prev_byte = 0;
        let mut chars = 0;

        for newline in memchr_iter(b'\n', text.as_bytes()) {
            chars += text[prev_byte..=newline].chars().count();
            prev_byte = newline + 1;
            line_starts.push(chars);
        }

        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based (line, column) of a character offset.
    pub fn position(&self, char_offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&char_offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line, char_offset - self.line_starts[line])
    }

    /// Character offset at which `line` starts, if the line exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }
}

/// Text of the zero-based `line`, without its line terminator.
pub fn line_text(text: &str, line: usize) -> &str {
    text.lines().nth(line).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hits_word_pattern() {
        let re = Regex::new(r"\w+").unwrap();
        let hits = extract_hits(&re, "foo bar foo");
        assert_eq!(hits, vec![("foo", 0), ("bar", 4), ("foo", 8)]);
    }

    #[test]
    fn test_extract_hits_char_offsets() {
        let re = Regex::new(r"\w+").unwrap();
        // "é" is two bytes but one character
        let hits = extract_hits(&re, "é1 ab");
        assert_eq!(hits, vec![("é1", 0), ("ab", 3)]);
    }

    #[test]
    fn test_extract_hits_skips_empty_matches() {
        let re = Regex::new(r"\w*").unwrap();
        let hits = extract_hits(&re, "a  b");
        assert_eq!(hits, vec![("a", 0), ("b", 3)]);
    }

    #[test]
    fn test_pattern_cache() {
        let mut cache = PatternCache::new();
        assert!(cache.get(r"\w+").is_ok());
        assert!(cache.get(r"\w+").is_ok());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(r"(unclosed").is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_line_index() {
        let text = "ab\ncdé\n\nx";
        let lines = LineIndex::new(text);
        assert_eq!(lines.line_count(), 4);
        assert_eq!(lines.position(0), (0, 0));
        assert_eq!(lines.position(4), (1, 1));
        assert_eq!(lines.position(7), (2, 0));
        assert_eq!(lines.position(8), (3, 0));
        assert_eq!(line_text(text, 1), "cdé");
    }

    #[test]
    fn test_char_to_byte() {
        assert_eq!(char_to_byte("éa", 1), 2);
        assert_eq!(char_to_byte("ab", 5), 2);
    }
}
