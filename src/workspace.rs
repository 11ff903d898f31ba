//! Workspace glue: the token index, the busy guard and the view cache wired
//! to the host capabilities.
//!
//! All index mutations go through [`Workspace`]. Each one runs inside the
//! busy guard, loads text from the [`DocumentSource`] (the only suspension
//! point), then commits to the index in one synchronous step and removes the
//! cached views its [`ChangeSet`] affects.

use futures::future::join_all;
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::cache::{CacheBus, keys};
use crate::config::Config;
use crate::error::{IndexError, Result, WorkspaceError};
use crate::events::DocumentBatch;
use crate::guard::BusyGuard;
use crate::host::{DocumentSource, LogNotifier, Notifier, TokenizerPattern};
use crate::index::{ChangeSet, DocId, EncodedToken, ScanStatus, TokenIndex};
use crate::navigation::{Location, PreviewTarget, TextRange};
use crate::utils::{LineIndex, char_to_byte, line_text};

/// Lines shown above and below a previewed location
const PREVIEW_CONTEXT: usize = 2;

/// What selecting a menu item leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Files,
    Tokens,
    Document(DocId),
    Token(String),
    Goto(PreviewTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub detail: String,
    pub action: MenuAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub title: String,
    pub items: Vec<MenuItem>,
}

/// One line of a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    /// Zero-based line number
    pub number: usize,
    /// Character offset of the line start in the document
    pub start: usize,
    pub text: String,
}

/// Text around a location, for tentative display while browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub location: Location,
    pub name: String,
    /// Zero-based line of the location start
    pub line: usize,
    pub column: usize,
    pub context: Vec<PreviewLine>,
}

/// A cached derived view.
#[derive(Debug, Clone)]
pub enum View {
    Menu(Rc<Menu>),
    Preview(Rc<Preview>),
}

/// One occurrence of a token, resolved to a line for printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub doc: DocId,
    pub name: String,
    /// Character offset in the document
    pub offset: usize,
    /// One-based line number
    pub line: usize,
    /// One-based column, in characters
    pub column: usize,
    pub line_text: String,
    /// Byte range of the token within `line_text`
    pub match_start: usize,
    pub match_end: usize,
}

/// Tally of a multi-document operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub detached: usize,
    /// Rejected by the document ceiling
    pub rejected: usize,
    /// Unreadable document or malformed pattern
    pub failed: usize,
}

impl ScanSummary {
    fn record(&mut self, result: &Result<ScanStatus>) {
        match result {
            Ok(ScanStatus::Skipped) => self.skipped += 1,
            Ok(ScanStatus::Scanned { .. }) => self.scanned += 1,
            Err(WorkspaceError::Index(IndexError::CapacityExceeded { .. })) => self.rejected += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub struct Workspace<S, P = Config, N = LogNotifier> {
    index: RefCell<TokenIndex>,
    guard: BusyGuard,
    views: RefCell<CacheBus<View>>,
    source: S,
    patterns: P,
    notifier: N,
}

impl<S, P, N> Workspace<S, P, N>
where
    S: DocumentSource,
    P: TokenizerPattern,
    N: Notifier,
{
    pub fn new(source: S, patterns: P, notifier: N, max_files: usize) -> Self {
        Self {
            index: RefCell::new(TokenIndex::new(max_files)),
            guard: BusyGuard::new(),
            views: RefCell::new(CacheBus::new()),
            source,
            patterns,
            notifier,
        }
    }

    /// Read access to the index. Do not hold across an await.
    pub fn index(&self) -> Ref<'_, TokenIndex> {
        self.index.borrow()
    }

    pub fn guard(&self) -> &BusyGuard {
        &self.guard
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn patterns(&self) -> &P {
        &self.patterns
    }

    /// Number of cached views.
    pub fn cached_views(&self) -> usize {
        self.views.borrow().len()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.views.borrow().contains(key)
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.views.borrow().hit_rate()
    }

    /// Scan a document unless it is already tracked.
    pub async fn open(&self, doc: &DocId) -> Result<ScanStatus> {
        self.scan(doc, false).await
    }

    /// Rescan a document from its current text.
    pub async fn rescan(&self, doc: &DocId) -> Result<ScanStatus> {
        self.scan(doc, true).await
    }

    pub async fn scan(&self, doc: &DocId, force: bool) -> Result<ScanStatus> {
        self.guard.run(self.scan_document(doc, force)).await
    }

    async fn scan_document(&self, doc: &DocId, force: bool) -> Result<ScanStatus> {
        if !force && self.index.borrow().is_tracked(doc) {
            return Ok(ScanStatus::Skipped);
        }

        let text = self.source.load_text(doc).await?;
        let pattern = self.patterns.pattern(&self.source.language_id(doc));
        let name = self.source.display_name(doc);

        // No await from here on: the index sees the whole diff at once
        let result = self.index.borrow_mut().scan(doc, &text, &pattern, force);
        match result {
            Ok(status) => {
                if let Some(changes) = status.changes() {
                    self.index.borrow_mut().set_display_name(doc, name);
                    self.invalidate(changes);
                }
                Ok(status)
            }
            Err(IndexError::CapacityExceeded { limit, first }) => {
                if first {
                    self.notifier.show_warning(&format!(
                        "Only the first {limit} documents are indexed; raise max_files to index more"
                    ));
                }
                Err(IndexError::CapacityExceeded { limit, first }.into())
            }
            Err(e) => {
                warn!(%doc, error = %e, "scan failed");
                self.notifier.append_log(&format!("{name}: {e}"));
                Err(e.into())
            }
        }
    }

    /// Stop tracking a document.
    pub async fn close(&self, doc: &DocId) -> ChangeSet {
        self.guard
            .run(async {
                let changes = self.index.borrow_mut().detach(doc);
                self.invalidate(&changes);
                changes
            })
            .await
    }

    /// Scan many documents concurrently under a single busy region.
    pub async fn scan_all(&self, docs: &[DocId], force: bool) -> ScanSummary {
        self.guard
            .run(async {
                let results = join_all(docs.iter().map(|doc| self.scan(doc, force))).await;
                let mut summary = ScanSummary::default();
                for result in &results {
                    summary.record(result);
                }
                debug!(?summary, "scan_all finished");
                summary
            })
            .await
    }

    /// Forget every document and every cached view.
    pub async fn reload(&self) {
        self.guard
            .run(async {
                self.index.borrow_mut().reload();
                self.views.borrow_mut().clear();
                info!("index reloaded");
            })
            .await
    }

    /// Reload, then scan `docs` from scratch.
    pub async fn rebuild(&self, docs: &[DocId]) -> ScanSummary {
        self.guard
            .run(async {
                self.reload().await;
                self.scan_all(docs, false).await
            })
            .await
    }

    /// Apply a coalesced batch of document events: closes first, then opens
    /// and changes concurrently.
    pub async fn apply(&self, batch: DocumentBatch) -> ScanSummary {
        self.guard
            .run(async {
                let mut summary = ScanSummary::default();
                for doc in &batch.closed {
                    if !self.close(doc).await.is_empty() {
                        summary.detached += 1;
                    }
                }

                let opened = batch.opened.iter().map(|doc| self.scan(doc, false));
                let changed = batch.changed.iter().map(|doc| self.scan(doc, true));
                let results = join_all(opened.chain(changed)).await;
                for result in &results {
                    summary.record(result);
                }
                summary
            })
            .await
    }

    /// Remove the cached views affected by one index mutation.
    fn invalidate(&self, changes: &ChangeSet) {
        let mut views = self.views.borrow_mut();
        if changes.file_list {
            views.remove_by_prefix(keys::ROOT);
            views.remove_by_prefix(keys::FILE_LIST);
        }
        if changes.tokens {
            views.remove_by_prefix(keys::ROOT);
            views.remove_by_prefix(keys::TOKEN_LIST);
            let index = self.index.borrow();
            for token in &changes.touched {
                views.remove_by_prefix(&keys::token(token));
                // Token menus of other documents show the global total
                for holder in index.holders(token) {
                    views.remove_by_prefix(&keys::document_tokens(holder));
                }
            }
        }
        if let Some(doc) = &changes.document {
            views.remove_by_prefix(&keys::document(doc));
            // File listings show per-document token counts
            views.remove_by_prefix(keys::FILE_LIST);
        }
    }

    fn menu(&self, key: &str, build: impl Fn(&TokenIndex) -> Menu) -> Rc<Menu> {
        let index = self.index.borrow();
        let mut views = self.views.borrow_mut();
        match views.get_or_compute(key, || View::Menu(Rc::new(build(&index)))) {
            View::Menu(menu) => Rc::clone(menu),
            // Keys of different view kinds never collide; rebuild uncached if they do
            View::Preview(_) => Rc::new(build(&index)),
        }
    }

    /// Entry menu: the file list and the token list.
    pub fn root_menu(&self) -> Rc<Menu> {
        self.menu(keys::ROOT, |index| Menu {
            title: "Token Navigator".to_string(),
            items: vec![
                MenuItem {
                    label: "Files".to_string(),
                    detail: format!("{} documents", index.doc_count()),
                    action: MenuAction::Files,
                },
                MenuItem {
                    label: "Tokens".to_string(),
                    detail: format!(
                        "{} tokens, {} occurrences",
                        index.unique_tokens(),
                        index.total_occurrences()
                    ),
                    action: MenuAction::Tokens,
                },
            ],
        })
    }

    /// Tracked documents ordered by display name.
    pub fn file_menu(&self) -> Rc<Menu> {
        self.menu(keys::FILE_LIST, |index| {
            let mut items: Vec<MenuItem> = index
                .documents()
                .into_iter()
                .map(|doc| MenuItem {
                    label: index.display_name(doc).to_string(),
                    detail: format!("{} tokens", index.tokens_in(doc).len()),
                    action: MenuAction::Document(doc.clone()),
                })
                .collect();
            items.sort_by(|a, b| a.label.cmp(&b.label));
            Menu {
                title: "Files".to_string(),
                items,
            }
        })
    }

    /// Every token, most frequent first.
    pub fn token_menu(&self) -> Rc<Menu> {
        self.menu(keys::TOKEN_LIST, |index| Menu {
            title: "Tokens".to_string(),
            items: index
                .tokens_by_count()
                .into_iter()
                .map(|(token, count)| MenuItem {
                    label: token.to_string(),
                    detail: count.to_string(),
                    action: MenuAction::Token(token.to_string()),
                })
                .collect(),
        })
    }

    /// Every occurrence of `token` as a jump target.
    pub fn token_locations(&self, token: &str) -> Rc<Menu> {
        let key = keys::token_locations(&EncodedToken::encode(token));
        self.menu(&key, |index| {
            let items = resolve_occurrences(index, token)
                .into_iter()
                .map(|occ| {
                    let len = token.chars().count();
                    MenuItem {
                        label: format!("{}:{}:{}", occ.name, occ.line, occ.column),
                        detail: occ.line_text.trim().to_string(),
                        action: MenuAction::Goto(PreviewTarget {
                            location: Location::new(
                                occ.doc,
                                TextRange::new(occ.offset, occ.offset + len),
                            ),
                            token: token.to_string(),
                        }),
                    }
                })
                .collect();
            Menu {
                title: format!("Locations of {token}"),
                items,
            }
        })
    }

    /// Tokens of one document in first-seen order.
    pub fn document_tokens(&self, doc: &DocId) -> Result<Rc<Menu>> {
        if !self.index.borrow().is_tracked(doc) {
            return Err(IndexError::NotTracked(doc.to_string()).into());
        }
        Ok(self.menu(&keys::document_tokens(doc), |index| Menu {
            title: index.display_name(doc).to_string(),
            items: index
                .tokens_in(doc)
                .into_iter()
                .map(|(token, offsets)| MenuItem {
                    label: token.to_string(),
                    detail: format!("{} in file, {} total", offsets.len(), index.count(token)),
                    action: MenuAction::Token(token.to_string()),
                })
                .collect(),
        }))
    }

    /// Lines around `location`, from the text of the document's last scan.
    pub fn preview(&self, location: &Location) -> Result<Rc<Preview>> {
        let doc = &location.doc;
        let key = keys::preview(doc, location.range.start);
        let index = self.index.borrow();
        let mut views = self.views.borrow_mut();

        let view = views.try_get_or_compute(&key, || -> Result<View> {
            let text = index
                .text(doc)
                .ok_or_else(|| IndexError::NotTracked(doc.to_string()))?;
            let preview = build_preview(location, index.display_name(doc), &text);
            Ok(View::Preview(Rc::new(preview)))
        })?;

        match view {
            View::Preview(preview) => Ok(Rc::clone(preview)),
            View::Menu(_) => Err(IndexError::NotTracked(doc.to_string()).into()),
        }
    }

    /// Every occurrence of `token`, grouped by document in lookup order.
    pub fn occurrences(&self, token: &str) -> Vec<Occurrence> {
        resolve_occurrences(&self.index.borrow(), token)
    }
}

fn resolve_occurrences(index: &TokenIndex, token: &str) -> Vec<Occurrence> {
    let token_len = token.chars().count();
    let mut occurrences = Vec::new();

    for hits in index.documents_for(token) {
        let Some(text) = index.text(&hits.doc) else {
            continue;
        };
        let lines = LineIndex::new(&text);
        for &offset in &hits.offsets {
            let (line, column) = lines.position(offset);
            let row = line_text(&text, line);
            let match_start = char_to_byte(row, column);
            let match_end = match_start + char_to_byte(&row[match_start..], token_len);
            occurrences.push(Occurrence {
                doc: hits.doc.clone(),
                name: hits.name.clone(),
                offset,
                line: line + 1,
                column: column + 1,
                line_text: row.to_string(),
                match_start,
                match_end,
            });
        }
    }

    occurrences
}

fn build_preview(location: &Location, name: &str, text: &str) -> Preview {
    let lines = LineIndex::new(text);
    let (line, column) = lines.position(location.range.start);
    let first = line.saturating_sub(PREVIEW_CONTEXT);
    let last = (line + PREVIEW_CONTEXT).min(lines.line_count().saturating_sub(1));

    Preview {
        location: location.clone(),
        name: name.to_string(),
        line,
        column,
        context: (first..=last)
            .map(|number| PreviewLine {
                number,
                start: lines.line_start(number).unwrap_or(0),
                text: line_text(text, number).to_string(),
            })
            .collect(),
    }
}
