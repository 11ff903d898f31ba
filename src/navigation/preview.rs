use indexmap::IndexSet;

use super::Location;

/// A candidate destination shown while browsing a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    pub location: Location,
    pub token: String,
}

/// Snapshot taken when a preview transaction starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub location: Option<Location>,
    pub pinned: Vec<String>,
}

/// Preview transaction and pinned highlights of one channel.
///
/// `pinned` is ordered by activation: the token made active most recently is
/// last and wins when highlighted ranges overlap.
#[derive(Debug, Default, Clone)]
pub struct PreviewState {
    backup: Option<Backup>,
    active: Option<PreviewTarget>,
    pinned: IndexSet<String>,
}

impl PreviewState {
    pub fn is_previewing(&self) -> bool {
        self.backup.is_some()
    }

    pub fn backup(&self) -> Option<&Backup> {
        self.backup.as_ref()
    }

    pub fn active(&self) -> Option<&PreviewTarget> {
        self.active.as_ref()
    }

    /// Take the snapshot unless one is already held. Returns true when a new
    /// snapshot was taken.
    pub(super) fn begin(&mut self, location: Option<Location>) -> bool {
        if self.backup.is_some() {
            return false;
        }
        self.backup = Some(Backup {
            location,
            pinned: self.pinned.iter().cloned().collect(),
        });
        true
    }

    pub(super) fn show(&mut self, target: PreviewTarget) {
        self.active = Some(target);
    }

    /// End the transaction, handing back the snapshot and the last shown
    /// target.
    pub(super) fn finish(&mut self) -> (Option<Backup>, Option<PreviewTarget>) {
        (self.backup.take(), self.active.take())
    }

    /// Restore the pinned set captured in `backup`.
    pub(super) fn restore_pinned(&mut self, backup: &Backup) {
        self.pinned = backup.pinned.iter().cloned().collect();
    }

    /// Pin `token` and make it the most recently used one.
    pub fn promote(&mut self, token: &str) {
        self.pinned.shift_remove(token);
        self.pinned.insert(token.to_string());
    }

    pub fn unpin(&mut self, token: &str) -> bool {
        self.pinned.shift_remove(token)
    }

    /// Pin or unpin `token`; returns whether it is pinned afterwards.
    pub fn toggle(&mut self, token: &str) -> bool {
        if self.unpin(token) {
            false
        } else {
            self.promote(token);
            true
        }
    }

    pub fn is_pinned(&self, token: &str) -> bool {
        self.pinned.contains(token)
    }

    /// Pinned tokens in z-order, most recently used last.
    pub fn pinned(&self) -> impl Iterator<Item = &str> {
        self.pinned.iter().map(String::as_str)
    }
}
