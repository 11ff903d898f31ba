//! Key-prefix cache for derived views (menus, previews).
//!
//! Entries stay until a caller removes them by key prefix or clears the bus;
//! there is no eviction policy. Keys are plain strings and prefix matching is
//! literal, not path-segment aware, so removing `token/#ab` also drops
//! `token/#abc`. Over-invalidation is harmless; a missed invalidation is not.

use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::trace;

use crate::index::{DocId, EncodedToken};

#[derive(Debug)]
pub struct CacheBus<V> {
    entries: BTreeMap<String, V>,
    hits: u64,
    misses: u64,
}

impl<V> Default for CacheBus<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V> CacheBus<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing and storing it first if
    /// absent.
    pub fn get_or_compute(&mut self, key: &str, producer: impl FnOnce() -> V) -> &V {
        if self.entries.contains_key(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            trace!(key, "cache miss");
            self.entries.insert(key.to_string(), producer());
        }
        &self.entries[key]
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for producers that can
    /// fail. Failures are not cached.
    pub fn try_get_or_compute<E>(
        &mut self,
        key: &str,
        producer: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        if self.entries.contains_key(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let value = producer()?;
            self.entries.insert(key.to_string(), value);
        }
        Ok(&self.entries[key])
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove every entry whose key starts with `prefix`. Returns the number
    /// of entries removed.
    pub fn remove_by_prefix(&mut self, prefix: &str) -> usize {
        // Keys sharing a prefix are contiguous in a sorted map
        let doomed: Vec<String> = self
            .entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }
        if !doomed.is_empty() {
            trace!(prefix, removed = doomed.len(), "cache invalidated");
        }
        doomed.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit rate over the bus' lifetime, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache key layout shared by every derived-view producer.
pub mod keys {
    use super::*;

    /// Root menu: summary of files and tokens.
    pub const ROOT: &str = "root";
    /// Prefix of file listings.
    pub const FILE_LIST: &str = "files";
    /// Prefix of global token listings.
    pub const TOKEN_LIST: &str = "tokens";
    /// Prefix of all per-token views.
    pub const TOKEN: &str = "token/";
    /// Prefix of all per-document views.
    pub const DOCUMENT: &str = "doc/";

    /// Prefix of the views derived from one token.
    pub fn token(token: &EncodedToken) -> String {
        format!("{TOKEN}{}/", token.as_str())
    }

    /// Prefix of the views derived from one document.
    pub fn document(doc: &DocId) -> String {
        format!("{DOCUMENT}{}/", doc.as_str())
    }

    pub fn token_locations(token: &EncodedToken) -> String {
        format!("{}locations", self::token(token))
    }

    pub fn document_tokens(doc: &DocId) -> String {
        format!("{}tokens", self::document(doc))
    }

    pub fn preview(doc: &DocId, offset: usize) -> String {
        format!("{}preview/{offset}", self::document(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_get_or_compute_caches() {
        let mut bus: CacheBus<usize> = CacheBus::new();
        let calls = Cell::new(0);
        let produce = || {
            calls.set(calls.get() + 1);
            7
        };

        assert_eq!(*bus.get_or_compute("root", produce), 7);
        assert_eq!(*bus.get_or_compute("root", produce), 7);
        assert_eq!(calls.get(), 1);
        assert_eq!(bus.hit_rate(), 0.5);
    }

    #[test]
    fn test_remove_by_prefix_is_literal() {
        let mut bus: CacheBus<&str> = CacheBus::new();
        for key in ["root", "files", "files/2", "token/#ab/", "token/#abc/", "token/#b/", "tokenx"] {
            bus.get_or_compute(key, || "v");
        }

        assert_eq!(bus.remove_by_prefix("token/#ab"), 2);
        assert!(bus.contains("token/#b/"));
        assert!(bus.contains("tokenx"));

        assert_eq!(bus.remove_by_prefix("files"), 2);
        assert_eq!(bus.remove_by_prefix("missing"), 0);
        assert_eq!(bus.len(), 3);

        assert_eq!(bus.remove_by_prefix(""), 3);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_remove_by_prefix_starts_between_keys() {
        let mut bus: CacheBus<u32> = CacheBus::new();
        for (i, key) in ["doc/", "doc/a/preview/3", "doc/a/tokens", "doc/ab/tokens", "doc/b/tokens"]
            .into_iter()
            .enumerate()
        {
            bus.get_or_compute(key, || i as u32);
        }

        assert_eq!(bus.remove_by_prefix("doc/a/"), 2);
        assert_eq!(bus.remove_by_prefix("doc/a"), 1);
        assert!(bus.contains("doc/"));
        assert!(bus.contains("doc/b/tokens"));
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_failed_producer_is_not_cached() {
        let mut bus: CacheBus<u8> = CacheBus::new();
        let err: Result<&u8, &str> = bus.try_get_or_compute("k", || Err("nope"));
        assert!(err.is_err());
        assert!(!bus.contains("k"));
        assert_eq!(bus.try_get_or_compute::<()>("k", || Ok(3)), Ok(&3));
    }

    #[test]
    fn test_keys_nest_under_scopes() {
        let token = EncodedToken::encode("foo");
        let doc = DocId::from("file:///a.rs");

        assert!(keys::token_locations(&token).starts_with(&keys::token(&token)));
        assert!(keys::token(&token).starts_with(keys::TOKEN));
        assert!(keys::preview(&doc, 12).starts_with(&keys::document(&doc)));
        assert!(keys::document_tokens(&doc).starts_with(keys::DOCUMENT));
        assert_ne!(keys::token(&token), keys::ROOT);
    }
}
