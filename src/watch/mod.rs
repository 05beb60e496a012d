// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which directories and files take part in watching (`filter`).
//! - Resolving the set of directories to register at startup (`watch_set`).
//! - Classifying raw events into qualifying changes (`classify`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** rebuild or restart anything; it only turns filesystem
//! activity into engine events.

pub mod classify;
pub mod filter;
pub mod path_utils;
pub mod watch_set;
pub mod watcher;

pub use classify::{ChangeClassifier, ChangeEvent, ChangeKind};
pub use filter::{PathFilter, BUILTIN_EXCLUDED_DIRS, TESTDATA_DIR};
pub use watch_set::WatchSet;
pub use watcher::{spawn_watcher, WatcherHandle};
