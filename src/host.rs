//! Capabilities supplied by the host environment.
//!
//! The index and the navigator never read files, pick tokenizer rules, show
//! messages or move cursors themselves; they go through these traits. The
//! filesystem, in-memory and logging implementations below back the CLI and
//! the terminal UI.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::HostError;
use crate::index::{DocId, Language};
use crate::navigation::{ChannelId, Location};
use crate::utils::relative_display;

/// Supplies the token-matching rule for a document kind.
pub trait TokenizerPattern {
    fn pattern(&self, language_id: &str) -> String;
}

/// Supplies document text and metadata.
pub trait DocumentSource {
    /// Current text of the document. May suspend on I/O.
    fn load_text(&self, doc: &DocId) -> impl Future<Output = Result<String, HostError>>;

    fn display_name(&self, doc: &DocId) -> String;

    fn language_id(&self, doc: &DocId) -> String;
}

/// Fire-and-forget user messages.
pub trait Notifier {
    fn show_warning(&self, message: &str);
    fn append_log(&self, message: &str);
}

/// The host editor's view, one cursor per channel.
pub trait Editor {
    fn position(&self, channel: ChannelId) -> Option<Location>;
    fn reveal(&mut self, channel: ChannelId, target: &Location) -> Result<(), HostError>;
}

/// Routes notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_warning(&self, message: &str) {
        warn!("{message}");
    }

    fn append_log(&self, message: &str) {
        info!("{message}");
    }
}

/// Documents backed by files under a workspace root. Document ids are
/// absolute paths.
///
/// Texts can be preloaded in bulk; a preloaded text is served once and later
/// loads go back to disk.
#[derive(Debug)]
pub struct FsDocuments {
    root: PathBuf,
    max_file_size: u64,
    preloaded: RefCell<FxHashMap<DocId, String>>,
}

impl FsDocuments {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
            preloaded: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stash text read ahead of time (e.g. by a parallel walk).
    pub fn preload(&self, doc: DocId, text: String) {
        self.preloaded.borrow_mut().insert(doc, text);
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

/// Validate raw file content against the size limit and UTF-8.
pub fn decode_text(doc: &DocId, bytes: Vec<u8>, max_file_size: u64) -> Result<String, HostError> {
    let len = bytes.len() as u64;
    if len > max_file_size {
        return Err(HostError::TooLarge(doc.to_string(), len));
    }
    String::from_utf8(bytes).map_err(|_| HostError::NotText(doc.to_string()))
}

impl DocumentSource for FsDocuments {
    async fn load_text(&self, doc: &DocId) -> Result<String, HostError> {
        let cached = self.preloaded.borrow_mut().remove(doc);
        if let Some(text) = cached {
            return Ok(text);
        }
        debug!(%doc, "reading document");
        let bytes = tokio::fs::read(doc.as_str()).await?;
        decode_text(doc, bytes, self.max_file_size)
    }

    fn display_name(&self, doc: &DocId) -> String {
        relative_display(&self.root, Path::new(doc.as_str()))
    }

    fn language_id(&self, doc: &DocId) -> String {
        Language::from_path(Path::new(doc.as_str())).id().to_string()
    }
}

#[derive(Debug, Clone)]
struct Buffer {
    name: String,
    language: String,
    text: String,
}

/// Documents held in memory (unsaved buffers, tests).
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    buffers: RefCell<FxHashMap<DocId, Buffer>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a buffer.
    pub fn insert(&self, doc: impl Into<DocId>, language: &str, text: impl Into<String>) {
        let doc = doc.into();
        let name = doc.fallback_name().to_string();
        self.buffers.borrow_mut().insert(
            doc,
            Buffer {
                name,
                language: language.to_string(),
                text: text.into(),
            },
        );
    }

    pub fn rename(&self, doc: &DocId, name: impl Into<String>) {
        if let Some(buffer) = self.buffers.borrow_mut().get_mut(doc) {
            buffer.name = name.into();
        }
    }

    pub fn remove(&self, doc: &DocId) {
        self.buffers.borrow_mut().remove(doc);
    }
}

impl DocumentSource for MemoryDocuments {
    async fn load_text(&self, doc: &DocId) -> Result<String, HostError> {
        let text = self.buffers.borrow().get(doc).map(|b| b.text.clone());
        // Hand control back once, as a real document open would
        tokio::task::yield_now().await;
        text.ok_or_else(|| {
            HostError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no buffer for {doc}"),
            ))
        })
    }

    fn display_name(&self, doc: &DocId) -> String {
        self.buffers
            .borrow()
            .get(doc)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| doc.fallback_name().to_string())
    }

    fn language_id(&self, doc: &DocId) -> String {
        self.buffers
            .borrow()
            .get(doc)
            .map(|b| b.language.clone())
            .unwrap_or_else(|| Language::Unknown.id().to_string())
    }
}

/// In-process cursors, one per channel. Reveals always succeed.
#[derive(Debug, Default, Clone)]
pub struct Cursors {
    positions: FxHashMap<ChannelId, Location>,
}

impl Cursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

impl Editor for Cursors {
    fn position(&self, channel: ChannelId) -> Option<Location> {
        self.positions.get(&channel).cloned()
    }

    fn reveal(&mut self, channel: ChannelId, target: &Location) -> Result<(), HostError> {
        self.positions.insert(channel, target.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::TextRange;

    #[tokio::test]
    async fn test_fs_documents_preload_then_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src").join("a.rs");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "fn on_disk() {}").unwrap();

        let docs = FsDocuments::new(dir.path(), 1024);
        let id = DocId::from_path(&path);
        docs.preload(id.clone(), "fn preloaded() {}".to_string());

        assert_eq!(docs.load_text(&id).await.unwrap(), "fn preloaded() {}");
        assert_eq!(docs.load_text(&id).await.unwrap(), "fn on_disk() {}");
        assert_eq!(docs.display_name(&id), "src/a.rs");
        assert_eq!(docs.language_id(&id), "rust");
    }

    #[tokio::test]
    async fn test_fs_documents_rejects_large_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.txt");
        let binary = dir.path().join("blob.bin");
        std::fs::write(&big, "x".repeat(64)).unwrap();
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();

        let docs = FsDocuments::new(dir.path(), 16);
        let err = docs.load_text(&DocId::from_path(&big)).await.unwrap_err();
        assert!(matches!(err, HostError::TooLarge(_, 64)));
        let err = docs.load_text(&DocId::from_path(&binary)).await.unwrap_err();
        assert!(matches!(err, HostError::NotText(_)));
        let err = docs.load_text(&DocId::from("/no/such/file")).await.unwrap_err();
        assert!(matches!(err, HostError::Io(_)));
    }

    #[tokio::test]
    async fn test_memory_documents() {
        let docs = MemoryDocuments::new();
        let id = DocId::from("mem://notes/todo.md");
        docs.insert(id.clone(), "markdown", "hello");

        assert_eq!(docs.load_text(&id).await.unwrap(), "hello");
        assert_eq!(docs.display_name(&id), "todo.md");
        assert_eq!(docs.language_id(&id), "markdown");

        docs.remove(&id);
        assert!(docs.load_text(&id).await.is_err());
        assert_eq!(docs.language_id(&id), "plaintext");
    }

    #[test]
    fn test_cursors() {
        let mut cursors = Cursors::new();
        let target = Location::new("a", TextRange::new(1, 2));
        assert!(cursors.position(ChannelId(0)).is_none());
        cursors.reveal(ChannelId(0), &target).unwrap();
        assert_eq!(cursors.position(ChannelId(0)), Some(target));
        assert!(cursors.position(ChannelId(1)).is_none());
    }
}
