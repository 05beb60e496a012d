// src/watch/watch_set.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{HotrunError, Result};
use crate::fs::FileSystem;
use crate::watch::filter::PathFilter;

/// Directories registered with the filesystem watcher.
///
/// Computed once at startup. Directories created later are not picked up;
/// restarting hotrun is the way to watch them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSet {
    root: PathBuf,
    dirs: BTreeSet<PathBuf>,
}

impl WatchSet {
    /// Walk `filter.root()` and collect every directory the filter accepts.
    ///
    /// Excluded directories are pruned, so nothing below them is ever
    /// visited. Symlinked directories are not followed. Any IO failure while
    /// walking is a setup failure.
    pub fn build(fs: &dyn FileSystem, filter: &PathFilter) -> Result<Self> {
        let root = filter.root().to_path_buf();

        if !fs.exists(&root) {
            return Err(HotrunError::SetupError(format!(
                "watch root {:?} does not exist",
                root
            )));
        }
        if !fs.is_dir(&root) {
            return Err(HotrunError::SetupError(format!(
                "watch root {:?} is not a directory",
                root
            )));
        }

        let mut dirs = BTreeSet::new();
        let mut stack = vec![root.clone()];

        while let Some(dir) = stack.pop() {
            if filter.should_watch_dir(&dir) {
                dirs.insert(dir.clone());
            }

            let entries = fs.read_dir(&dir).map_err(|e| {
                HotrunError::SetupError(format!("walking {:?}: {e:#}", dir))
            })?;

            for entry in entries {
                if !fs.is_dir(&entry) || fs.is_symlink(&entry) {
                    continue;
                }
                if filter.should_descend(&entry) {
                    stack.push(entry);
                } else {
                    debug!(dir = ?entry, "skipping excluded directory");
                }
            }
        }

        info!(root = ?root, count = dirs.len(), "resolved watch set");
        Ok(Self { root, dirs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    /// Membership test for a root-relative directory (`""` is the root).
    pub fn contains_relative(&self, rel: impl AsRef<Path>) -> bool {
        self.dirs.contains(&self.root.join(rel))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}
