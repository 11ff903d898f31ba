//! Document event coalescing
//!
//! Collects open/change/close notifications from the host within a debounce
//! window and folds them into one [`DocumentBatch`] per document. Bursts such
//! as a save-all or a branch switch then cost a single scan per document.

use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::index::DocId;

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The document became visible to the host (scan unless tracked)
    Opened,
    /// The document's text changed (forced rescan)
    Changed,
    /// The document went away (detach)
    Closed,
}

/// Coalesced work for the index, one entry per document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBatch {
    pub opened: Vec<DocId>,
    pub changed: Vec<DocId>,
    pub closed: Vec<DocId>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: DocId, event: DocumentEvent) {
        match event {
            DocumentEvent::Opened => self.opened.push(doc),
            DocumentEvent::Changed => self.changed.push(doc),
            DocumentEvent::Closed => self.closed.push(doc),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.changed.is_empty() && self.closed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.opened.len() + self.changed.len() + self.closed.len()
    }
}

/// Accumulates document events until the stream has been quiet for the
/// configured window.
#[derive(Debug)]
pub struct EventCoalescer {
    window: Duration,
    /// Pending event per document, in first-seen order
    pending: IndexMap<DocId, DocumentEvent>,
    last_event: Option<Instant>,
}

impl EventCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: IndexMap::new(),
            last_event: None,
        }
    }

    /// Record an event, folding it into any pending event for the same
    /// document.
    pub fn add(&mut self, doc: DocId, event: DocumentEvent) {
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.pending.get(&doc) else {
            self.pending.insert(doc, event);
            return;
        };

        let folded = match (existing, event) {
            // Text loaded while opening is still an open
            (DocumentEvent::Opened, DocumentEvent::Changed) => DocumentEvent::Opened,
            // Never seen by the index
            (DocumentEvent::Opened, DocumentEvent::Closed) => {
                self.pending.shift_remove(&doc);
                return;
            }
            (DocumentEvent::Changed, DocumentEvent::Closed) => DocumentEvent::Closed,
            // Reopened: whatever the index holds is stale
            (DocumentEvent::Closed, DocumentEvent::Opened) => DocumentEvent::Changed,
            (DocumentEvent::Closed, DocumentEvent::Changed) => DocumentEvent::Changed,
            (_, newer) => newer,
        };
        self.pending.insert(doc, folded);
    }

    /// True once the window has elapsed since the last event.
    pub fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|last| last.elapsed() >= self.window)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Time left until the pending events are ready, `None` when idle.
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_event
            .map(|last| self.window.saturating_sub(last.elapsed()))
    }

    /// Drain pending events into a batch. Returns `None` when nothing is
    /// pending.
    pub fn flush(&mut self) -> Option<DocumentBatch> {
        self.last_event = None;
        if self.pending.is_empty() {
            return None;
        }

        let mut batch = DocumentBatch::new();
        for (doc, event) in self.pending.drain(..) {
            batch.add(doc, event);
        }
        Some(batch)
    }

    /// Drop pending events without producing a batch.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_event = None;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
