use crate::config::Config;
use crate::guard::BusyState;
use crate::host::{Cursors, Editor};
use crate::index::DocId;
use crate::index::build::{self, FsWorkspace};
use crate::navigation::{ChannelId, NavState, Navigator, PreviewTarget};
use crate::workspace::{Menu, MenuAction, MenuItem, Preview, PreviewLine};
use anyhow::Result;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::runtime::Runtime;

/// The browser has a single viewport
pub const MAIN: ChannelId = ChannelId(0);

/// Rows moved by PageUp/PageDown
const PAGE: usize = 10;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Help,
}

/// Which view a menu level shows, so it can be rebuilt after the index changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSource {
    Root,
    Files,
    Tokens,
    Locations(String),
    Document(DocId),
}

/// Ways of bringing the index up to date with the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Rescan only what changed; history is kept
    Refresh,
    /// Rebuild from scratch; history is dropped with the old offsets
    Reindex,
}

pub struct Level {
    pub source: MenuSource,
    pub menu: Rc<Menu>,
    pub selected: usize,
}

/// Application state
pub struct App {
    pub root: PathBuf,
    config: Config,
    globs: Vec<String>,
    runtime: Runtime,
    pub workspace: FsWorkspace,
    pub navigator: Navigator,
    pub cursors: Cursors,
    /// Menu being browsed
    pub level: Level,
    /// Menus above the current one, outermost first
    pub parents: Vec<Level>,
    pub mode: Mode,
    pub status_message: String,
    /// Mirrors the workspace guard
    busy: Rc<Cell<bool>>,
    /// Index update to run on the next loop iteration, after the status has
    /// been drawn
    pub pending: Option<Update>,
    pub should_quit: bool,
}

impl App {
    pub fn new(root: PathBuf, config: Config, globs: Vec<String>) -> Result<Self> {
        let runtime = build::runtime()?;
        let (workspace, summary) = build::index_workspace(&runtime, &root, &config, &globs, true)?;

        let busy = Rc::new(Cell::new(false));
        let flag = Rc::clone(&busy);
        workspace
            .guard()
            .set_observer(move |state| flag.set(state == BusyState::Busy));

        let menu = workspace.root_menu();
        let mut status_message = format!(
            "Indexed {} files, {} tokens",
            summary.scanned,
            workspace.index().unique_tokens()
        );
        if summary.rejected > 0 {
            status_message.push_str(&format!(" ({} over the file limit)", summary.rejected));
        }

        Ok(Self {
            root,
            navigator: Navigator::new(config.trailing_highlight),
            config,
            globs,
            runtime,
            workspace,
            cursors: Cursors::new(),
            level: Level {
                source: MenuSource::Root,
                menu,
                selected: 0,
            },
            parents: Vec::new(),
            mode: Mode::Browse,
            status_message,
            busy,
            pending: None,
            should_quit: false,
        })
    }

    fn build_menu(&self, source: &MenuSource) -> Rc<Menu> {
        match source {
            MenuSource::Root => self.workspace.root_menu(),
            MenuSource::Files => self.workspace.file_menu(),
            MenuSource::Tokens => self.workspace.token_menu(),
            MenuSource::Locations(token) => self.workspace.token_locations(token),
            MenuSource::Document(doc) => self.workspace.document_tokens(doc).unwrap_or_else(|_| {
                Rc::new(Menu {
                    title: doc.fallback_name().to_string(),
                    items: Vec::new(),
                })
            }),
        }
    }

    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.level.menu.items.get(self.level.selected)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get() || self.pending.is_some()
    }

    pub fn is_previewing(&self) -> bool {
        self.navigator.state(MAIN) == NavState::Previewing
    }

    pub fn depths(&self) -> (usize, usize) {
        self.navigator.depths(MAIN)
    }

    pub fn pinned(&self) -> Vec<&str> {
        self.navigator.pinned(MAIN)
    }

    fn select(&mut self, index: usize) {
        let len = self.level.menu.items.len();
        if len == 0 {
            return;
        }
        self.level.selected = index.min(len - 1);
        self.preview_selected();
    }

    pub fn select_next(&mut self) {
        self.select(self.level.selected + 1);
    }

    pub fn select_prev(&mut self) {
        self.select(self.level.selected.saturating_sub(1));
    }

    pub fn select_page_down(&mut self) {
        self.select(self.level.selected + PAGE);
    }

    pub fn select_page_up(&mut self) {
        self.select(self.level.selected.saturating_sub(PAGE));
    }

    pub fn select_first(&mut self) {
        self.select(0);
    }

    pub fn select_last(&mut self) {
        self.select(usize::MAX);
    }

    /// Show the selected location tentatively.
    fn preview_selected(&mut self) {
        if let Some(MenuAction::Goto(target)) = self.selected_item().map(|i| i.action.clone()) {
            self.navigator.preview_show(&mut self.cursors, MAIN, target);
        }
    }

    /// Enter: jump to a location, or open a submenu.
    pub fn enter(&mut self) {
        let Some(action) = self.selected_item().map(|i| i.action.clone()) else {
            return;
        };

        match action {
            MenuAction::Goto(target) => self.jump(target),
            MenuAction::Files => self.push(MenuSource::Files),
            MenuAction::Tokens => self.push(MenuSource::Tokens),
            MenuAction::Document(doc) => self.push(MenuSource::Document(doc)),
            MenuAction::Token(token) => self.push(MenuSource::Locations(token)),
        }
    }

    fn jump(&mut self, target: PreviewTarget) {
        let previewed = self.navigator.active_preview(MAIN) == Some(&target);
        if previewed && let Some(outcome) = self.navigator.accept(MAIN) {
            self.status_message = match outcome.promoted {
                Some(token) => format!("Jumped to {token}"),
                None => "Jumped".to_string(),
            };
            return;
        }
        self.navigator.preview_rollback(&mut self.cursors, MAIN);
        self.status_message = format!("Jumped to {}", target.token);
        self.navigator.goto(&mut self.cursors, MAIN, target.location);
    }

    fn push(&mut self, source: MenuSource) {
        self.navigator.preview_rollback(&mut self.cursors, MAIN);
        let menu = self.build_menu(&source);
        let parent = std::mem::replace(
            &mut self.level,
            Level {
                source,
                menu,
                selected: 0,
            },
        );
        self.parents.push(parent);
        self.preview_selected();
    }

    /// Esc: cancel a running preview, else leave the menu, else quit.
    pub fn back(&mut self) {
        if self.is_previewing() {
            self.navigator.preview_rollback(&mut self.cursors, MAIN);
            self.status_message = "Preview cancelled".to_string();
            return;
        }
        match self.parents.pop() {
            Some(parent) => {
                self.level = parent;
                self.refresh_level();
            }
            None => self.should_quit = true,
        }
    }

    pub fn undo(&mut self) {
        self.navigator.preview_rollback(&mut self.cursors, MAIN);
        let (undo_depth, _) = self.depths();
        self.status_message = match self.navigator.undo(&mut self.cursors, MAIN) {
            Some(location) => format!("Back to {}", self.workspace.index().display_name(&location.doc)),
            None if undo_depth > 0 => "Back to start".to_string(),
            None => "Nothing to undo".to_string(),
        };
    }

    pub fn redo(&mut self) {
        self.navigator.preview_rollback(&mut self.cursors, MAIN);
        self.status_message = match self.navigator.redo(&mut self.cursors, MAIN) {
            Some(location) => format!("Forward to {}", self.workspace.index().display_name(&location.doc)),
            None => "Nothing to redo".to_string(),
        };
    }

    /// Token the selection refers to, if any.
    fn selected_token(&self) -> Option<String> {
        match &self.selected_item()?.action {
            MenuAction::Token(token) => Some(token.clone()),
            MenuAction::Goto(target) => Some(target.token.clone()),
            _ => None,
        }
    }

    pub fn toggle_pin(&mut self) {
        let Some(token) = self.selected_token() else {
            return;
        };
        self.status_message = if self.navigator.toggle_pin(MAIN, &token) {
            format!("Pinned {token}")
        } else {
            format!("Unpinned {token}")
        };
    }

    pub fn request(&mut self, update: Update) {
        self.status_message = match update {
            Update::Refresh => "Refreshing...",
            Update::Reindex => "Reindexing...",
        }
        .to_string();
        self.pending = Some(update);
    }

    /// Run the requested update, if any.
    pub fn run_pending(&mut self) {
        match self.pending.take() {
            Some(Update::Refresh) => self.refresh(),
            Some(Update::Reindex) => self.reindex(),
            None => {}
        }
    }

    /// Rescan files that changed on disk, open new ones and close vanished
    /// ones.
    pub fn refresh(&mut self) {
        self.navigator.preview_rollback(&mut self.cursors, MAIN);

        match build::refresh_workspace(&self.runtime, &self.workspace, &self.config, &self.globs) {
            Ok(summary) if summary.scanned + summary.detached == 0 => {
                self.status_message = "Nothing changed".to_string();
            }
            Ok(summary) => {
                self.status_message = format!(
                    "Rescanned {} files, closed {}",
                    summary.scanned, summary.detached
                );
            }
            Err(e) => self.status_message = format!("Refresh failed: {e}"),
        }
        self.rebuild_menus();
    }

    /// Re-walk the workspace and rebuild the index. Navigation history
    /// refers to offsets in the old texts and is dropped.
    pub fn reindex(&mut self) {
        self.navigator.preview_rollback(&mut self.cursors, MAIN);

        match build::reindex_workspace(&self.runtime, &self.workspace, &self.config, &self.globs) {
            Ok(summary) => {
                self.status_message = format!(
                    "Reindexed {} files, {} tokens",
                    summary.scanned,
                    self.workspace.index().unique_tokens()
                );
            }
            Err(e) => self.status_message = format!("Reindex failed: {e}"),
        }
        self.navigator.clear();
        self.cursors.clear();
        self.rebuild_menus();
    }

    fn rebuild_menus(&mut self) {
        for i in 0..self.parents.len() {
            let menu = self.build_menu(&self.parents[i].source);
            self.parents[i].menu = menu;
        }
        self.refresh_level();
    }

    fn refresh_level(&mut self) {
        self.level.menu = self.build_menu(&self.level.source);
        let len = self.level.menu.items.len();
        self.level.selected = self.level.selected.min(len.saturating_sub(1));
    }

    /// Text around the viewport's cursor.
    pub fn view(&self) -> Option<Rc<Preview>> {
        let location = self.cursors.position(MAIN)?;
        self.workspace.preview(&location).ok()
    }

    /// Character ranges of pinned tokens on `line`, as (start, end, pin slot).
    /// Later entries are more recently used and paint over earlier ones.
    pub fn highlights(&self, preview: &Preview, line: &PreviewLine) -> Vec<(usize, usize, usize)> {
        let index = self.workspace.index();
        let line_len = line.text.chars().count();
        let mut ranges = Vec::new();

        for (slot, token) in self.pinned().into_iter().enumerate() {
            let len = token.chars().count();
            for &offset in index.postings(&preview.location.doc, token) {
                if offset >= line.start && offset < line.start + line_len {
                    let start = offset - line.start;
                    ranges.push((start, (start + len).min(line_len), slot));
                }
            }
        }
        ranges
    }

    pub fn show_help(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn hide_help(&mut self) {
        self.mode = Mode::Browse;
    }
}
