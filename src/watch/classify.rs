// src/watch/classify.rs

//! Turning raw watcher events into "qualifying changes".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use crate::watch::filter::PathFilter;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Write,
    Create,
    Remove,
    Rename,
}

/// A single filesystem change, consumed once by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Map a `notify` event onto zero or more change events.
    ///
    /// Access events and pure metadata updates (permissions, timestamps) are
    /// dropped here; they never describe new content. The destination of a
    /// rename is reported as a create, so an atomic save (write a temp file,
    /// rename it over the source) looks like any other new file.
    pub fn from_notify(event: &Event) -> Vec<ChangeEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Create,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                return Self::from_rename_pair(&event.paths);
            }
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
            EventKind::Modify(_) => ChangeKind::Write,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|p| ChangeEvent::new(p.clone(), kind))
            .collect()
    }

    // `paths` is `[from, to]`.
    fn from_rename_pair(paths: &[PathBuf]) -> Vec<ChangeEvent> {
        paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 1 {
                    ChangeKind::Create
                } else {
                    ChangeKind::Rename
                };
                ChangeEvent::new(p.clone(), kind)
            })
            .collect()
    }
}

/// Decides whether a change should trigger a rebuild.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    filter: Arc<PathFilter>,
}

impl ChangeClassifier {
    pub fn new(filter: Arc<PathFilter>) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Only writes and creates of eligible files in watchable directories
    /// qualify. Removes and renames never do; a rename that produces a new
    /// eligible file arrives as a create (see [`ChangeEvent::from_notify`]).
    pub fn is_qualifying_change(&self, event: &ChangeEvent) -> bool {
        if !matches!(event.kind, ChangeKind::Write | ChangeKind::Create) {
            return false;
        }

        let parent = event.path.parent().unwrap_or_else(|| Path::new(""));
        self.filter.should_watch_dir(parent) && self.filter.should_watch_file(&event.path)
    }
}
