//! Navigation history and preview transactions.
//!
//! Every logical viewport ("channel") has its own undo/redo stacks and its own
//! preview transaction. A preview lets a menu move the view through many
//! candidates and then either commit to the last one or roll back to where it
//! started, without recording every hover in history.
//!
//! Per channel the navigator is either `Idle` or `Previewing`:
//!
//! ```text
//! Idle --preview_backup/preview_show--> Previewing
//! Previewing --preview_show--> Previewing
//! Previewing --preview_commit/preview_rollback/goto--> Idle
//! ```

pub mod history;
pub mod preview;

pub use history::{History, HistoryEntry};
pub use preview::{Backup, PreviewState, PreviewTarget};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::host::Editor;
use crate::index::DocId;

/// Identity of a viewport with its own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ChannelId(pub u32);

/// Half-open character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A selection in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub doc: DocId,
    pub range: TextRange,
}

impl Location {
    pub fn new(doc: impl Into<DocId>, range: TextRange) -> Self {
        Self {
            doc: doc.into(),
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Previewing,
}

/// Result of committing a preview transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Highlights of the backup that must be refreshed (trailing highlight).
    pub touched: Vec<String>,
    /// Token promoted to most-recently-used among pinned tokens.
    pub promoted: Option<String>,
}

#[derive(Debug, Default)]
struct Channel {
    history: History,
    preview: PreviewState,
}

/// Undo/redo and preview state for every channel.
///
/// The navigator never touches the token index; it only moves the host
/// editor's view through [`Editor`]. Failed moves are logged and otherwise
/// ignored.
#[derive(Debug, Default)]
pub struct Navigator {
    channels: FxHashMap<ChannelId, Channel>,
    trailing_highlight: bool,
}

impl Navigator {
    pub fn new(trailing_highlight: bool) -> Self {
        Self {
            channels: FxHashMap::default(),
            trailing_highlight,
        }
    }

    pub fn set_trailing_highlight(&mut self, enabled: bool) {
        self.trailing_highlight = enabled;
    }

    fn channel(&mut self, channel: ChannelId) -> &mut Channel {
        self.channels.entry(channel).or_default()
    }

    pub fn state(&self, channel: ChannelId) -> NavState {
        match self.channels.get(&channel) {
            Some(c) if c.preview.is_previewing() => NavState::Previewing,
            _ => NavState::Idle,
        }
    }

    /// Jump to `target`, recording a history entry.
    ///
    /// The undo target is the origin of a running preview if there is one,
    /// otherwise the editor's current position. A running preview is
    /// abandoned without restoring the view.
    pub fn goto(&mut self, editor: &mut impl Editor, channel: ChannelId, target: Location) {
        let current = editor.position(channel);
        let state = self.channel(channel);
        let undo = match state.preview.finish() {
            (Some(backup), _) => backup.location,
            (None, _) => current,
        };

        state.history.record(HistoryEntry {
            redo: target.clone(),
            undo,
        });
        debug!(?channel, doc = %target.doc, "goto");
        move_to(editor, channel, &target);
    }

    /// Step back. Returns the location moved to, if any.
    pub fn undo(&mut self, editor: &mut impl Editor, channel: ChannelId) -> Option<Location> {
        let state = self.channel(channel);
        let entry = state.history.pop_undo()?;
        let target = entry.undo.clone();
        state.history.push_redo(entry);

        if let Some(target) = &target {
            move_to(editor, channel, target);
        }
        target
    }

    /// Step forward. The entry's undo target is overwritten with the current
    /// position so that the next undo returns here.
    pub fn redo(&mut self, editor: &mut impl Editor, channel: ChannelId) -> Option<Location> {
        let current = editor.position(channel);
        let state = self.channel(channel);
        let mut entry = state.history.pop_redo()?;
        entry.undo = current;
        let target = entry.redo.clone();
        state.history.push_undo(entry);

        move_to(editor, channel, &target);
        Some(target)
    }

    /// Start a preview transaction, capturing the current position and pinned
    /// highlights. Does nothing if one is already running.
    pub fn preview_backup(&mut self, editor: &impl Editor, channel: ChannelId) {
        let current = editor.position(channel);
        if self.channel(channel).preview.begin(current) {
            debug!(?channel, "preview started");
        }
    }

    /// Tentatively show `candidate`. History is not touched.
    pub fn preview_show(
        &mut self,
        editor: &mut impl Editor,
        channel: ChannelId,
        candidate: PreviewTarget,
    ) {
        self.preview_backup(&*editor, channel);
        move_to(editor, channel, &candidate.location);
        self.channel(channel).preview.show(candidate);
    }

    /// Keep the view where the preview left it and end the transaction.
    pub fn preview_commit(&mut self, channel: ChannelId) -> CommitOutcome {
        let trailing = self.trailing_highlight;
        let state = self.channel(channel);
        let (backup, active) = state.preview.finish();

        let mut outcome = CommitOutcome::default();
        if let Some(backup) = backup
            && trailing
        {
            outcome.touched = backup.pinned;
        }
        if let Some(active) = active {
            state.preview.promote(&active.token);
            outcome.promoted = Some(active.token);
        }
        outcome
    }

    /// Return to the position and highlights captured at backup time.
    pub fn preview_rollback(
        &mut self,
        editor: &mut impl Editor,
        channel: ChannelId,
    ) -> Option<Location> {
        let state = self.channel(channel);
        let (backup, _) = state.preview.finish();
        let backup = backup?;
        state.preview.restore_pinned(&backup);

        if let Some(location) = &backup.location {
            move_to(editor, channel, location);
        }
        backup.location
    }

    /// Commit the running preview and record it as one history step from the
    /// preview's origin to the committed target.
    pub fn accept(&mut self, channel: ChannelId) -> Option<CommitOutcome> {
        let state = self.channel(channel);
        let target = state.preview.active()?.location.clone();
        let origin = state.preview.backup().and_then(|b| b.location.clone());

        let outcome = self.preview_commit(channel);
        self.channel(channel).history.record(HistoryEntry {
            redo: target,
            undo: origin,
        });
        Some(outcome)
    }

    pub fn active_preview(&self, channel: ChannelId) -> Option<&PreviewTarget> {
        self.channels.get(&channel)?.preview.active()
    }

    pub fn peek_undo(&self, channel: ChannelId) -> Option<&HistoryEntry> {
        self.channels.get(&channel)?.history.peek_undo()
    }

    pub fn peek_redo(&self, channel: ChannelId) -> Option<&HistoryEntry> {
        self.channels.get(&channel)?.history.peek_redo()
    }

    /// (undo depth, redo depth) of a channel.
    pub fn depths(&self, channel: ChannelId) -> (usize, usize) {
        self.channels
            .get(&channel)
            .map(|c| (c.history.undo_depth(), c.history.redo_depth()))
            .unwrap_or((0, 0))
    }

    pub fn pin(&mut self, channel: ChannelId, token: &str) {
        self.channel(channel).preview.promote(token);
    }

    pub fn unpin(&mut self, channel: ChannelId, token: &str) -> bool {
        self.channel(channel).preview.unpin(token)
    }

    pub fn toggle_pin(&mut self, channel: ChannelId, token: &str) -> bool {
        self.channel(channel).preview.toggle(token)
    }

    /// Pinned tokens of a channel, most recently used last.
    pub fn pinned(&self, channel: ChannelId) -> Vec<&str> {
        self.channels
            .get(&channel)
            .map(|c| c.preview.pinned().collect())
            .unwrap_or_default()
    }

    /// Forget every channel's history and preview state.
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

fn move_to(editor: &mut impl Editor, channel: ChannelId, target: &Location) {
    if let Err(e) = editor.reveal(channel, target) {
        warn!(?channel, doc = %target.doc, error = %e, "failed to move cursor");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const MAIN: ChannelId = ChannelId(0);
    const SIDE: ChannelId = ChannelId(1);

    #[derive(Default)]
    struct FakeEditor {
        positions: HashMap<ChannelId, Location>,
        reveals: usize,
        fail: bool,
    }

    impl Editor for FakeEditor {
        fn position(&self, channel: ChannelId) -> Option<Location> {
            self.positions.get(&channel).cloned()
        }

        fn reveal(&mut self, channel: ChannelId, target: &Location) -> Result<(), HostError> {
            self.reveals += 1;
            if self.fail {
                return Err(HostError::Editor("gone".to_string()));
            }
            self.positions.insert(channel, target.clone());
            Ok(())
        }
    }

    fn at(doc: &str, offset: usize) -> Location {
        Location::new(doc, TextRange::new(offset, offset + 3))
    }

    fn editor_at(location: Location) -> FakeEditor {
        let mut editor = FakeEditor::default();
        editor.positions.insert(MAIN, location);
        editor
    }

    fn target(doc: &str, offset: usize, token: &str) -> PreviewTarget {
        PreviewTarget {
            location: at(doc, offset),
            token: token.to_string(),
        }
    }

    #[test]
    fn test_goto_undo_redo() {
        let origin = at("a", 0);
        let mut editor = editor_at(origin.clone());
        let mut nav = Navigator::new(true);

        nav.goto(&mut editor, MAIN, at("a", 10));
        nav.goto(&mut editor, MAIN, at("b", 20));
        assert_eq!(editor.position(MAIN), Some(at("b", 20)));

        assert_eq!(nav.undo(&mut editor, MAIN), Some(at("a", 10)));
        assert_eq!(editor.position(MAIN), Some(at("a", 10)));

        assert_eq!(nav.redo(&mut editor, MAIN), Some(at("b", 20)));
        assert_eq!(editor.position(MAIN), Some(at("b", 20)));

        assert_eq!(nav.undo(&mut editor, MAIN), Some(at("a", 10)));
        assert_eq!(nav.undo(&mut editor, MAIN), Some(origin));
        assert_eq!(nav.undo(&mut editor, MAIN), None);
        assert_eq!(nav.depths(MAIN), (0, 2));
    }

    #[test]
    fn test_goto_after_undo_discards_redo() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(true);

        nav.goto(&mut editor, MAIN, at("a", 10));
        nav.undo(&mut editor, MAIN);
        assert!(nav.peek_redo(MAIN).is_some());

        nav.goto(&mut editor, MAIN, at("c", 5));
        assert!(nav.peek_redo(MAIN).is_none());
        assert_eq!(nav.redo(&mut editor, MAIN), None);
        assert_eq!(nav.peek_undo(MAIN).unwrap().redo, at("c", 5));
    }

    #[test]
    fn test_redo_overwrites_undo_target_with_current_position() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(true);

        nav.goto(&mut editor, MAIN, at("a", 10));
        nav.undo(&mut editor, MAIN);
        // User wanders off without recording history
        editor.positions.insert(MAIN, at("z", 99));

        nav.redo(&mut editor, MAIN);
        assert_eq!(nav.peek_undo(MAIN).unwrap().undo, Some(at("z", 99)));
        assert_eq!(nav.undo(&mut editor, MAIN), Some(at("z", 99)));
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut editor = FakeEditor::default();
        let mut nav = Navigator::new(true);
        assert_eq!(nav.undo(&mut editor, MAIN), None);
        assert_eq!(nav.redo(&mut editor, MAIN), None);
        assert_eq!(editor.reveals, 0);
    }

    #[test]
    fn test_undo_without_origin_does_not_move() {
        let mut editor = FakeEditor::default();
        let mut nav = Navigator::new(true);
        nav.goto(&mut editor, MAIN, at("a", 1));
        assert_eq!(editor.reveals, 1);

        assert_eq!(nav.undo(&mut editor, MAIN), None);
        assert_eq!(editor.reveals, 1);
        assert_eq!(nav.depths(MAIN), (0, 1));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut editor = editor_at(at("a", 0));
        editor.positions.insert(SIDE, at("s", 0));
        let mut nav = Navigator::new(true);

        nav.goto(&mut editor, MAIN, at("a", 10));
        nav.goto(&mut editor, SIDE, at("s", 10));
        nav.undo(&mut editor, MAIN);

        assert_eq!(nav.depths(MAIN), (0, 1));
        assert_eq!(nav.depths(SIDE), (1, 0));
        assert_eq!(editor.position(SIDE), Some(at("s", 10)));
    }

    #[test]
    fn test_preview_rollback_restores_origin() {
        let origin = at("a", 0);
        let mut editor = editor_at(origin.clone());
        let mut nav = Navigator::new(true);

        nav.preview_backup(&editor, MAIN);
        assert_eq!(nav.state(MAIN), NavState::Previewing);
        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));
        nav.preview_show(&mut editor, MAIN, target("y", 2, "bar"));
        assert_eq!(editor.position(MAIN), Some(at("y", 2)));

        assert_eq!(nav.preview_rollback(&mut editor, MAIN), Some(origin.clone()));
        assert_eq!(editor.position(MAIN), Some(origin));
        assert_eq!(nav.state(MAIN), NavState::Idle);
        assert_eq!(nav.depths(MAIN), (0, 0));
        assert!(nav.pinned(MAIN).is_empty());
    }

    #[test]
    fn test_preview_commit_keeps_view_and_promotes_token() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(true);
        nav.pin(MAIN, "bar");
        nav.pin(MAIN, "baz");

        nav.preview_backup(&editor, MAIN);
        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));
        nav.preview_show(&mut editor, MAIN, target("y", 2, "bar"));
        let outcome = nav.preview_commit(MAIN);

        assert_eq!(editor.position(MAIN), Some(at("y", 2)));
        assert_eq!(outcome.promoted.as_deref(), Some("bar"));
        assert_eq!(outcome.touched, vec!["bar".to_string(), "baz".to_string()]);
        assert_eq!(nav.pinned(MAIN), vec!["baz", "bar"]);
        assert_eq!(nav.depths(MAIN), (0, 0));
        assert_eq!(nav.state(MAIN), NavState::Idle);
    }

    #[test]
    fn test_commit_without_trailing_highlight_touches_nothing() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(false);
        nav.pin(MAIN, "old");
        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));

        let outcome = nav.preview_commit(MAIN);
        assert!(outcome.touched.is_empty());
        assert_eq!(nav.pinned(MAIN), vec!["old", "foo"]);
    }

    #[test]
    fn test_backup_is_idempotent() {
        let origin = at("a", 0);
        let mut editor = editor_at(origin.clone());
        let mut nav = Navigator::new(true);

        nav.preview_backup(&editor, MAIN);
        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));
        nav.preview_backup(&editor, MAIN);

        assert_eq!(nav.preview_rollback(&mut editor, MAIN), Some(origin));
    }

    #[test]
    fn test_rollback_restores_pinned_set() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(true);
        nav.pin(MAIN, "keep");

        nav.preview_backup(&editor, MAIN);
        nav.pin(MAIN, "transient");
        nav.unpin(MAIN, "keep");
        nav.preview_rollback(&mut editor, MAIN);

        assert_eq!(nav.pinned(MAIN), vec!["keep"]);
    }

    #[test]
    fn test_goto_while_previewing_uses_backup_origin() {
        let origin = at("a", 0);
        let mut editor = editor_at(origin.clone());
        let mut nav = Navigator::new(true);

        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));
        nav.goto(&mut editor, MAIN, at("q", 7));

        assert_eq!(nav.state(MAIN), NavState::Idle);
        assert_eq!(nav.peek_undo(MAIN).unwrap().undo, Some(origin.clone()));
        assert_eq!(nav.undo(&mut editor, MAIN), Some(origin));
    }

    #[test]
    fn test_accept_records_single_entry() {
        let origin = at("a", 0);
        let mut editor = editor_at(origin.clone());
        let mut nav = Navigator::new(true);

        nav.preview_show(&mut editor, MAIN, target("x", 1, "foo"));
        nav.preview_show(&mut editor, MAIN, target("y", 2, "bar"));
        let outcome = nav.accept(MAIN).unwrap();

        assert_eq!(outcome.promoted.as_deref(), Some("bar"));
        assert_eq!(nav.depths(MAIN), (1, 0));
        assert_eq!(
            nav.peek_undo(MAIN),
            Some(&HistoryEntry {
                redo: at("y", 2),
                undo: Some(origin.clone()),
            })
        );
        assert_eq!(nav.undo(&mut editor, MAIN), Some(origin));
        assert!(nav.accept(MAIN).is_none());
    }

    #[test]
    fn test_failed_reveal_is_swallowed() {
        let mut editor = editor_at(at("a", 0));
        editor.fail = true;
        let mut nav = Navigator::new(true);

        nav.goto(&mut editor, MAIN, at("b", 1));
        assert_eq!(nav.depths(MAIN), (1, 0));
        assert_eq!(editor.position(MAIN), Some(at("a", 0)));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut editor = editor_at(at("a", 0));
        let mut nav = Navigator::new(true);
        nav.goto(&mut editor, MAIN, at("b", 1));
        nav.pin(MAIN, "t");
        nav.preview_backup(&editor, MAIN);

        nav.clear();
        assert_eq!(nav.depths(MAIN), (0, 0));
        assert_eq!(nav.state(MAIN), NavState::Idle);
        assert!(nav.pinned(MAIN).is_empty());
    }
}
