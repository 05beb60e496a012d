// src/config/mod.rs

//! Configuration loading and validation for hotrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply CLI overrides (`loader.rs`).
//! - Validate commands, durations and patterns (`validate.rs`).
//!
//! The engine only ever sees the validated [`ConfigFile`]; it is shared
//! behind an `Arc` and never mutated once an engine is built.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{
    default_config_path, load_and_validate, load_config, load_from_path, ConfigOverrides,
};
pub use model::{BuildConfig, BuildSection, ConfigFile, RawConfigFile};
