use crate::nav::{Params, ScreenKind, ScreenRef, Transition};

/// One back-stack step: the page that was left and how we got away from it
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub screen: ScreenRef,
    /// Parameters the page had when it was left (used to recreate it)
    pub params: Params,
    /// Transition used going forward; `back()` plays its reverse
    pub transition: Transition,
}

impl HistoryEntry {
    pub fn new(screen: ScreenRef, transition: Transition) -> Self {
        let params = screen.params();
        Self {
            screen,
            params,
            transition,
        }
    }

    pub fn kind(&self) -> ScreenKind {
        self.screen.kind()
    }
}

/// LIFO page history.
///
/// Pages and their transitions are stored as pairs, so the two can never
/// drift out of step.
#[derive(Debug, Default)]
pub struct BackStack {
    entries: Vec<HistoryEntry>,
}

impl BackStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        log::debug!("Back stack push: {} ({}), depth {}", entry.kind(), entry.transition, self.entries.len() + 1);
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        let entry = self.entries.pop();
        if let Some(entry) = &entry {
            log::debug!("Back stack pop: {} ({}), depth {}", entry.kind(), entry.transition, self.entries.len());
        }
        entry
    }

    /// Drop the whole history, returning the removed entries
    pub fn clear(&mut self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Kinds from bottom to top
    pub fn kinds(&self) -> Vec<ScreenKind> {
        self.entries.iter().map(HistoryEntry::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
