// src/watch/filter.rs

//! Pure predicates deciding which directories and files take part in watching.
//!
//! All decisions are made on the cleaned, root-relative form of a path, so the
//! same filter answers for absolute event paths from the watcher and for the
//! relative paths produced while walking the tree.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::config::ConfigFile;
use crate::errors::{HotrunError, Result};
use crate::watch::path_utils::{clean_path, relative_to_root, slash_str};

/// Directory base names that are never watched.
pub const BUILTIN_EXCLUDED_DIRS: &[&str] = &[".git", "node_modules", "vendor"];

/// Any path below a directory with this name is ignored.
pub const TESTDATA_DIR: &str = "testdata";

/// Compiled include/exclude rules for one engine.
#[derive(Clone)]
pub struct PathFilter {
    root: PathBuf,
    tmp_dir: PathBuf,
    excluded_dir_names: BTreeSet<String>,
    excluded_dir_paths: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    include_ext: BTreeSet<String>,
    include_file: Vec<String>,
    exclude_file: Vec<String>,
    exclude_globs: GlobSet,
    exclude_regex: Vec<Regex>,
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("root", &self.root)
            .field("tmp_dir", &self.tmp_dir)
            .field("include_dirs", &self.include_dirs)
            .field("include_ext", &self.include_ext)
            .finish_non_exhaustive()
    }
}

impl PathFilter {
    /// Compile the filter from a validated config.
    ///
    /// Pattern compilation can still fail here when a `ConfigFile` was built
    /// by hand; such failures surface as `ConfigError`.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let build = &cfg.build;

        let mut excluded_dir_names: BTreeSet<String> = BUILTIN_EXCLUDED_DIRS
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut excluded_dir_paths = Vec::new();

        for entry in &build.exclude_dir {
            let cleaned = clean_path(Path::new(entry.trim()));
            if cleaned.as_os_str().is_empty() {
                continue;
            }
            if cleaned.components().count() == 1 {
                excluded_dir_names.insert(slash_str(&cleaned));
            } else {
                excluded_dir_paths.push(cleaned);
            }
        }

        let tmp_dir = clean_path(&cfg.tmp_dir);
        if let Some(name) = tmp_dir.file_name().and_then(|n| n.to_str()) {
            excluded_dir_names.insert(name.to_string());
        }

        Ok(Self {
            root: cfg.root.clone(),
            tmp_dir,
            excluded_dir_names,
            excluded_dir_paths,
            include_dirs: build.include_dir.iter().map(|d| clean_path(d)).collect(),
            include_ext: build.include_ext.clone(),
            include_file: build.include_file.clone(),
            exclude_file: build.exclude_file.clone(),
            exclude_globs: build_globset(&build.exclude_glob)?,
            exclude_regex: build_regexes(&build.exclude_regex)?,
        })
    }

    /// Root directory all rules are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cleaned path relative to the root, if the path can be related to it.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        relative_to_root(&self.root, path)
    }

    /// Whether a directory should be registered with the watcher.
    ///
    /// A directory is rejected if it, or any directory between it and the
    /// root, is excluded. With a non-empty include list it must also equal
    /// an include entry or live below one.
    pub fn should_watch_dir(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        !self.is_excluded_tree(&rel) && self.is_included(&rel)
    }

    /// Whether the walk has to enter a directory.
    ///
    /// True for watched directories and for ancestors of include entries
    /// that must be crossed to reach them.
    pub fn should_descend(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        if self.is_excluded_tree(&rel) {
            return false;
        }
        self.is_included(&rel) || self.include_dirs.iter().any(|d| d.starts_with(&rel))
    }

    /// Whether changes to this file are worth a rebuild.
    pub fn should_watch_file(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        let Some(name) = rel.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if let Some(parent) = rel.parent() {
            if self.in_builtin_excluded_area(parent) {
                return false;
            }
        }

        let rel_str = slash_str(&rel);

        let included = self.has_included_ext(&rel)
            || self.include_file.iter().any(|s| rel_str.ends_with(s.as_str()));
        if !included {
            return false;
        }

        if self.exclude_file.iter().any(|s| rel_str.ends_with(s.as_str())) {
            return false;
        }

        if self.exclude_globs.is_match(name) {
            return false;
        }

        !self.exclude_regex.iter().any(|re| re.is_match(name))
    }

    fn has_included_ext(&self, rel: &Path) -> bool {
        rel.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.include_ext.contains(ext))
    }

    fn is_included(&self, rel: &Path) -> bool {
        self.include_dirs.is_empty() || self.include_dirs.iter().any(|d| rel.starts_with(d))
    }

    /// Exclusion check for `rel` and every ancestor up to (not including) the root.
    fn is_excluded_tree(&self, rel: &Path) -> bool {
        rel.ancestors()
            .filter(|a| !a.as_os_str().is_empty())
            .any(|a| self.is_excluded_dir(a))
    }

    fn is_excluded_dir(&self, rel: &Path) -> bool {
        if self.in_builtin_excluded_area(rel) {
            return true;
        }
        if let Some(name) = rel.file_name().and_then(|n| n.to_str()) {
            if self.excluded_dir_names.contains(name) {
                return true;
            }
        }
        self.excluded_dir_paths.iter().any(|p| p == rel)
    }

    /// Inside the tmp directory, or below a `testdata` directory.
    fn in_builtin_excluded_area(&self, rel: &Path) -> bool {
        if !self.tmp_dir.as_os_str().is_empty() && rel.starts_with(&self.tmp_dir) {
            return true;
        }
        rel.components()
            .any(|c| c.as_os_str() == std::ffi::OsStr::new(TESTDATA_DIR))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| {
            HotrunError::ConfigError(format!("invalid exclude glob '{pat}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| HotrunError::ConfigError(format!("building exclude globset: {e}")))
}

fn build_regexes(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pat| {
            Regex::new(pat).map_err(|e| {
                HotrunError::ConfigError(format!("invalid exclude regex '{pat}': {e}"))
            })
        })
        .collect()
}
