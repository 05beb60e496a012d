// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: drop `.` components and resolve `..` against the
/// preceding component where possible. Never touches the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().map(|c| c.as_os_str()).collect()
}

/// Express `path` relative to `root`, cleaned.
///
/// - Paths under `root` (after cleaning both) are stripped.
/// - Other relative paths are taken to be relative to `root` already.
/// - If that fails (e.g. symlinked absolute prefixes such as macOS's
///   `/private/var`), both are canonicalized and we try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_to_root(root: &Path, path: &Path) -> Option<PathBuf> {
    let root_clean = clean_path(root);
    let path_clean = clean_path(path);

    if let Ok(rel) = path_clean.strip_prefix(&root_clean) {
        return Some(rel.to_path_buf());
    }

    if path.is_relative() {
        return Some(path_clean);
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_path_buf());
        }
    }

    None
}

/// Forward-slash string form of a relative path, used for suffix matching.
pub fn slash_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
