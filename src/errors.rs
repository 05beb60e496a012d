// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! The variants follow the phases of the supervisor so that every log line
//! can name where a failure happened:
//! - `SetupError` is fatal and aborts startup (watcher, directory walk).
//! - `BuildError`, `StartError` and `KillError` are recovered locally by the
//!   engine and only ever logged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Setup failed: {0}")]
    SetupError(String),

    #[error("build failed: {0}")]
    BuildError(String),

    #[error("failed to start process: {0}")]
    StartError(String),

    #[error("failed to kill process: {0}")]
    KillError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for HotrunError {
    fn from(err: notify::Error) -> Self {
        HotrunError::SetupError(format!("file watcher: {err}"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HotrunError>;
