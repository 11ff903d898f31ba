use crate::error::IndexError;
use crate::index::types::*;
use crate::utils::{PatternCache, extract_hits};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Offsets of every token in one document, in first-seen order.
pub type DocPostings = IndexMap<EncodedToken, Vec<usize>, FxBuildHasher>;

/// In-memory inverted index of tokens across tracked documents.
///
/// The index owns four maps that are kept in lockstep:
///
/// - document → token → posting list (`postings`)
/// - token → documents containing it (`inverted`)
/// - token → total occurrence count (`counts`)
/// - document → display name / last scanned text (`names`, `texts`)
///
/// A token is present in `inverted` iff it is present in `counts`, and its
/// count always equals the summed length of its posting lists. Every mutation
/// computes its full diff before touching shared state and none of its steps
/// can fail, so the maps are never observed half-updated.
#[derive(Debug)]
pub struct TokenIndex {
    max_files: usize,
    postings: FxHashMap<DocId, DocPostings>,
    inverted: FxHashMap<EncodedToken, BTreeSet<DocId>>,
    counts: FxHashMap<EncodedToken, usize>,
    names: FxHashMap<DocId, String>,
    texts: FxHashMap<DocId, Arc<str>>,
    /// Set after the first capacity rejection, cleared on reload
    capacity_warned: bool,
    patterns: PatternCache,
}

impl TokenIndex {
    /// Create an empty index that tracks at most `max_files` documents.
    pub fn new(max_files: usize) -> Self {
        Self {
            max_files,
            postings: FxHashMap::default(),
            inverted: FxHashMap::default(),
            counts: FxHashMap::default(),
            names: FxHashMap::default(),
            texts: FxHashMap::default(),
            capacity_warned: false,
            patterns: PatternCache::new(),
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Change the document ceiling. Already tracked documents are kept even
    /// when they exceed the new limit.
    pub fn set_max_files(&mut self, max_files: usize) {
        self.max_files = max_files;
    }

    /// Tokenize `text` with `pattern` and replace the postings of `doc`.
    ///
    /// A tracked document is left alone unless `force` is set. Only the
    /// difference between the previous and the new token set is applied to
    /// the shared maps.
    pub fn scan(
        &mut self,
        doc: &DocId,
        text: &str,
        pattern: &str,
        force: bool,
    ) -> Result<ScanStatus, IndexError> {
        let tracked = self.postings.contains_key(doc);
        if tracked && !force {
            trace!(%doc, "scan skipped, already tracked");
            return Ok(ScanStatus::Skipped);
        }

        let regex = self
            .patterns
            .get(pattern)
            .map_err(|source| IndexError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        if !tracked && self.postings.len() >= self.max_files {
            let first = !self.capacity_warned;
            self.capacity_warned = true;
            debug!(%doc, limit = self.max_files, "scan rejected, document limit reached");
            return Err(IndexError::CapacityExceeded {
                limit: self.max_files,
                first,
            });
        }

        let mut fresh = DocPostings::default();
        for (token, offset) in extract_hits(regex, text) {
            fresh
                .entry(EncodedToken::encode(token))
                .or_default()
                .push(offset);
        }

        let previous = self.postings.remove(doc).unwrap_or_default();
        let touched = self.apply_diff(doc, &previous, &fresh);

        debug!(
            %doc,
            tokens = fresh.len(),
            removed = previous.keys().filter(|t| !fresh.contains_key(*t)).count(),
            "scanned document"
        );

        self.postings.insert(doc.clone(), fresh);
        self.texts.insert(doc.clone(), Arc::from(text));

        Ok(ScanStatus::Scanned {
            added: !tracked,
            changes: ChangeSet {
                file_list: !tracked,
                tokens: true,
                document: Some(doc.clone()),
                touched,
            },
        })
    }

    /// Drop every trace of `doc`. Returns an empty change set when the
    /// document was not tracked.
    pub fn detach(&mut self, doc: &DocId) -> ChangeSet {
        let Some(previous) = self.postings.remove(doc) else {
            return ChangeSet::default();
        };

        let touched = self.apply_diff(doc, &previous, &DocPostings::default());
        self.names.remove(doc);
        self.texts.remove(doc);

        debug!(%doc, tokens = previous.len(), "detached document");

        ChangeSet {
            file_list: true,
            tokens: true,
            document: Some(doc.clone()),
            touched,
        }
    }

    /// Forget everything and re-arm the capacity warning.
    pub fn reload(&mut self) {
        self.postings.clear();
        self.inverted.clear();
        self.counts.clear();
        self.names.clear();
        self.texts.clear();
        self.capacity_warned = false;
    }

    /// Apply the transition `old` → `new` for `doc` to the inverted map and
    /// the count map. Returns every token present on either side.
    fn apply_diff(&mut self, doc: &DocId, old: &DocPostings, new: &DocPostings) -> Vec<EncodedToken> {
        for token in old.keys().filter(|t| !new.contains_key(*t)) {
            if let Some(docs) = self.inverted.get_mut(token) {
                docs.remove(doc);
                if docs.is_empty() {
                    self.inverted.remove(token);
                }
            }
        }
        for token in new.keys().filter(|t| !old.contains_key(*t)) {
            self.inverted
                .entry(token.clone())
                .or_default()
                .insert(doc.clone());
        }

        // Net delta per token, so a token on both sides is touched once
        let mut deltas: FxHashMap<&EncodedToken, isize> = FxHashMap::default();
        for (token, offsets) in old {
            *deltas.entry(token).or_default() -= offsets.len() as isize;
        }
        for (token, offsets) in new {
            *deltas.entry(token).or_default() += offsets.len() as isize;
        }

        let mut touched = Vec::with_capacity(deltas.len());
        for (token, delta) in deltas {
            self.adjust_count(token, delta);
            touched.push(token.clone());
        }
        touched.sort();
        touched
    }

    fn adjust_count(&mut self, token: &EncodedToken, delta: isize) {
        if delta == 0 {
            return;
        }
        let current = self.counts.get(token).copied().unwrap_or(0) as isize;
        let next = current + delta;
        debug_assert!(next >= 0, "negative count for {token}");
        if next <= 0 {
            self.counts.remove(token);
        } else {
            self.counts.insert(token.clone(), next as usize);
        }
    }

    /// Remember the host's display name for a tracked document.
    pub fn set_display_name(&mut self, doc: &DocId, name: impl Into<String>) {
        if self.postings.contains_key(doc) {
            self.names.insert(doc.clone(), name.into());
        }
    }

    /// Display name of a document, falling back to the last segment of its id.
    pub fn display_name<'a>(&'a self, doc: &'a DocId) -> &'a str {
        self.names
            .get(doc)
            .map(String::as_str)
            .unwrap_or_else(|| doc.fallback_name())
    }

    /// Text of the document as of its last scan.
    pub fn text(&self, doc: &DocId) -> Option<Arc<str>> {
        self.texts.get(doc).cloned()
    }

    pub fn is_tracked(&self, doc: &DocId) -> bool {
        self.postings.contains_key(doc)
    }

    pub fn doc_count(&self) -> usize {
        self.postings.len()
    }

    /// Number of distinct tokens across all documents.
    pub fn unique_tokens(&self) -> usize {
        self.counts.len()
    }

    /// Number of token occurrences across all documents.
    pub fn total_occurrences(&self) -> usize {
        self.counts.values().sum()
    }

    /// Total occurrences of `token`, zero when absent.
    pub fn count(&self, token: &str) -> usize {
        self.counts
            .get(&EncodedToken::encode(token))
            .copied()
            .unwrap_or(0)
    }

    /// Offsets of `token` in `doc`; empty for unknown documents or tokens.
    pub fn postings(&self, doc: &DocId, token: &str) -> &[usize] {
        self.postings
            .get(doc)
            .and_then(|map| map.get(&EncodedToken::encode(token)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tracked documents containing an encoded token, by id.
    pub fn holders(&self, token: &EncodedToken) -> impl Iterator<Item = &DocId> {
        self.inverted.get(token).into_iter().flatten()
    }

    /// Documents containing `token`, most hits first, then by id.
    pub fn documents_for(&self, token: &str) -> Vec<DocumentHits> {
        let key = EncodedToken::encode(token);
        let Some(docs) = self.inverted.get(&key) else {
            return Vec::new();
        };

        let mut hits: Vec<DocumentHits> = docs
            .iter()
            .filter_map(|doc| {
                let offsets = self.postings.get(doc)?.get(&key)?;
                Some(DocumentHits {
                    doc: doc.clone(),
                    name: self.display_name(doc).to_string(),
                    offsets: offsets.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.count().cmp(&a.count()).then_with(|| a.doc.cmp(&b.doc)));
        hits
    }

    /// Every token with its total count, most frequent first, then by text.
    pub fn tokens_by_count(&self) -> Vec<(&str, usize)> {
        let mut tokens: Vec<_> = self
            .counts
            .iter()
            .map(|(token, &count)| (token.decode(), count))
            .collect();
        tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tokens
    }

    /// Tokens of one document with their offsets, in first-seen order.
    pub fn tokens_in(&self, doc: &DocId) -> Vec<(&str, &[usize])> {
        self.postings
            .get(doc)
            .map(|map| {
                map.iter()
                    .map(|(token, offsets)| (token.decode(), offsets.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tracked documents ordered by id.
    pub fn documents(&self) -> Vec<&DocId> {
        let mut docs: Vec<_> = self.postings.keys().collect();
        docs.sort();
        docs
    }

    /// Verify the cross-map invariants. Intended for tests and fuzzing; walks
    /// every posting list.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut expected: FxHashMap<&EncodedToken, usize> = FxHashMap::default();
        for (doc, map) in &self.postings {
            for (token, offsets) in map {
                if offsets.is_empty() {
                    return Err(format!("empty posting list for {token} in {doc}"));
                }
                *expected.entry(token).or_default() += offsets.len();
                let listed = self.inverted.get(token).is_some_and(|docs| docs.contains(doc));
                if !listed {
                    return Err(format!("{doc} missing from inverted entry of {token}"));
                }
            }
        }

        if expected.len() != self.counts.len() {
            return Err(format!(
                "count map has {} tokens, postings have {}",
                self.counts.len(),
                expected.len()
            ));
        }
        for (token, count) in &expected {
            if self.counts.get(*token) != Some(count) {
                return Err(format!(
                    "count of {token} is {:?}, postings sum to {count}",
                    self.counts.get(*token)
                ));
            }
        }

        if self.inverted.len() != self.counts.len() {
            return Err("inverted map and count map hold different tokens".to_string());
        }
        for (token, docs) in &self.inverted {
            if docs.is_empty() {
                return Err(format!("empty inverted entry for {token}"));
            }
            for doc in docs {
                let present = self.postings.get(doc).is_some_and(|map| map.contains_key(token));
                if !present {
                    return Err(format!("inverted entry of {token} lists {doc} without postings"));
                }
            }
        }

        Ok(())
    }
}
