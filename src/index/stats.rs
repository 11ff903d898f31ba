use crate::index::{Language, TokenIndex};
use crate::workspace::ScanSummary;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Aggregate figures about an index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub unique_tokens: usize,
    pub occurrences: usize,
    pub max_files: usize,
    /// (language id, document count), most documents first
    pub languages: Vec<(String, usize)>,
}

impl IndexStats {
    pub fn collect(index: &TokenIndex) -> Self {
        let mut lang_counts: HashMap<&'static str, usize> = HashMap::new();
        for doc in index.documents() {
            let language = Language::from_path(Path::new(doc.as_str()));
            *lang_counts.entry(language.id()).or_insert(0) += 1;
        }

        let mut languages: Vec<_> = lang_counts
            .into_iter()
            .map(|(lang, count)| (lang.to_string(), count))
            .collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            documents: index.doc_count(),
            unique_tokens: index.unique_tokens(),
            occurrences: index.total_occurrences(),
            max_files: index.max_files(),
            languages,
        }
    }

    /// Average number of occurrences per token
    pub fn density(&self) -> f64 {
        if self.unique_tokens == 0 {
            0.0
        } else {
            self.occurrences as f64 / self.unique_tokens as f64
        }
    }
}

/// Display index statistics
pub fn show_stats(root: &Path, stats: &IndexStats, summary: &ScanSummary) {
    println!("Index Statistics");
    println!("================");
    println!();
    println!("Root path:        {}", root.display());
    println!("Documents:        {} (limit {})", stats.documents, stats.max_files);
    println!("Unique tokens:    {}", stats.unique_tokens);
    println!("Occurrences:      {}", stats.occurrences);
    println!("Per token:        {:.2}", stats.density());

    if summary.rejected > 0 || summary.failed > 0 {
        println!();
        println!("Over limit:       {}", summary.rejected);
        println!("Unreadable:       {}", summary.failed);
    }

    println!();
    println!("Files by language:");
    for (lang, count) in stats.languages.iter().take(15) {
        println!("  {:15} {}", lang, count);
    }

    if stats.languages.len() > 15 {
        println!("  ... and {} more", stats.languages.len() - 15);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocId;

    #[test]
    fn test_collect() {
        let mut index = TokenIndex::new(100);
        for (path, text) in [("/w/a.rs", "a b"), ("/w/b.rs", "a"), ("/w/c.py", "c"), ("/w/README", "a")] {
            index.scan(&DocId::from(path), text, r"\w+", false).unwrap();
        }

        let stats = IndexStats::collect(&index);
        assert_eq!(stats.documents, 4);
        assert_eq!(stats.unique_tokens, 3);
        assert_eq!(stats.occurrences, 5);
        assert_eq!(
            stats.languages,
            vec![
                ("rust".to_string(), 2),
                ("plaintext".to_string(), 1),
                ("python".to_string(), 1),
            ]
        );
        assert!((stats.density() - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_density() {
        let stats = IndexStats::collect(&TokenIndex::new(1));
        assert_eq!(stats.density(), 0.0);
        assert!(stats.languages.is_empty());
    }
}
