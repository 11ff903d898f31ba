use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Opaque document identifier (a URI-like string).
///
/// Cheap to clone; ordering is plain string ordering, which is the tie-break
/// order for document listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(Arc<str>);

impl DocId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the id, used when the host supplies no name.
    pub fn fallback_name(&self) -> &str {
        self.0
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.as_str())
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DocId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Serialize for DocId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Escape prefix put in front of every token used as a map or cache key.
pub const TOKEN_PREFIX: char = '#';

/// A token as stored in the index maps: the raw token text behind
/// [`TOKEN_PREFIX`], so it never collides with reserved keys such as the
/// cache bus' root-menu key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedToken(String);

impl EncodedToken {
    pub fn encode(token: &str) -> Self {
        let mut key = String::with_capacity(token.len() + 1);
        key.push(TOKEN_PREFIX);
        key.push_str(token);
        Self(key)
    }

    /// Token text without the escape prefix.
    pub fn decode(&self) -> &str {
        &self.0[TOKEN_PREFIX.len_utf8()..]
    }

    /// Encoded key, prefix included.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.decode())
    }
}

/// Outcome of a successful [`scan`](crate::index::TokenIndex::scan).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// Document already tracked and the scan was not forced; nothing happened.
    Skipped,
    /// Postings were (re)built. `added` is true when the document was new.
    Scanned { added: bool, changes: ChangeSet },
}

impl ScanStatus {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ScanStatus::Skipped)
    }

    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            ScanStatus::Skipped => None,
            ScanStatus::Scanned { changes, .. } => Some(changes),
        }
    }
}

/// Signals fired by one index mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// The set of tracked documents changed.
    pub file_list: bool,
    /// Token counts or token membership changed.
    pub tokens: bool,
    /// The document whose postings were replaced or dropped.
    pub document: Option<DocId>,
    /// Tokens whose postings for `document` were present before or after.
    pub touched: Vec<EncodedToken>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.file_list && !self.tokens && self.document.is_none()
    }
}

/// One row of a token → documents lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentHits {
    pub doc: DocId,
    pub name: String,
    pub offsets: Vec<usize>,
}

impl DocumentHits {
    pub fn count(&self) -> usize {
        self.offsets.len()
    }
}

/// Language detection, used to pick a tokenizer pattern per document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Unknown,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    C,
    Cpp,
    Java,
    Ruby,
    Shell,
    Markdown,
    Json,
    Yaml,
    Toml,
    Html,
    Css,
    Sql,
    Haskell,
    Kotlin,
    Php,
    CSharp,
    Elixir,
    Clojure,
    Lisp,
    Lua,
    Perl,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyi" | "pyw" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "mts" | "cts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Language::Cpp,
            "java" => Language::Java,
            "rb" | "rake" => Language::Ruby,
            "sh" | "bash" | "zsh" | "fish" => Language::Shell,
            "md" | "markdown" => Language::Markdown,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "html" | "htm" => Language::Html,
            "css" | "scss" | "sass" | "less" => Language::Css,
            "sql" => Language::Sql,
            "hs" | "lhs" => Language::Haskell,
            "kt" | "kts" => Language::Kotlin,
            "php" => Language::Php,
            "cs" => Language::CSharp,
            "ex" | "exs" => Language::Elixir,
            "clj" | "cljs" | "cljc" | "edn" => Language::Clojure,
            "el" | "lisp" | "scm" | "rkt" => Language::Lisp,
            "lua" => Language::Lua,
            "pl" | "pm" => Language::Perl,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }

    /// Language id as used for tokenizer pattern overrides.
    pub fn id(self) -> &'static str {
        match self {
            Language::Unknown => "plaintext",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::Shell => "shellscript",
            Language::Markdown => "markdown",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Html => "html",
            Language::Css => "css",
            Language::Sql => "sql",
            Language::Haskell => "haskell",
            Language::Kotlin => "kotlin",
            Language::Php => "php",
            Language::CSharp => "csharp",
            Language::Elixir => "elixir",
            Language::Clojure => "clojure",
            Language::Lisp => "lisp",
            Language::Lua => "lua",
            Language::Perl => "perl",
        }
    }
}
