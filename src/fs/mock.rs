// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
}

/// In-memory tree for deterministic watch-set tests.
///
/// Paths are stored exactly as given, rooted at `"."`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Add a file, creating parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        entries.insert(path.clone(), MockEntry::File);
        link_into_parent(&mut entries, &path);
    }

    /// Add an (empty) directory, creating parents implicitly.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        ensure_dir_entry(&mut entries, &path);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a panicking test; keep going.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(Path::new("."))
    } else {
        Some(parent)
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_into_parent(entries, path);
}

fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }
    ensure_dir_entry(entries, parent);
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Stored paths are already canonical; only existence is checked.
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("No such file or directory: {:?}", path))
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                let mut out: Vec<PathBuf> = children.iter().map(|name| path.join(name)).collect();
                out.sort();
                Ok(out)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
