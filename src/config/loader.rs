// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{HotrunError, Result};

/// Values from the command line that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<String>,
    pub build_cmd: Option<String>,
    pub bin: Option<String>,
    pub send_interrupt: Option<bool>,
    pub kill_delay: Option<String>,
}

impl ConfigOverrides {
    /// Write every override that is set into `raw`.
    pub fn apply(&self, raw: &mut RawConfigFile) {
        if let Some(root) = &self.root {
            raw.root = root.clone();
        }
        if let Some(cmd) = &self.build_cmd {
            raw.build.cmd = cmd.clone();
        }
        if let Some(bin) = &self.bin {
            raw.build.bin = bin.clone();
        }
        if let Some(send_interrupt) = self.send_interrupt {
            raw.build.send_interrupt = send_interrupt;
        }
        if let Some(delay) = &self.kill_delay {
            raw.build.kill_delay = delay.clone();
        }
    }
}

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the config the way the CLI does.
///
/// - An existing file is parsed.
/// - A missing file is only tolerated when it is the default path; built-in
///   defaults are used instead.
/// - `overrides` are applied before validation.
pub fn load_config(path: impl AsRef<Path>, overrides: &ConfigOverrides) -> Result<ConfigFile> {
    let path = path.as_ref();

    let mut raw = if path.exists() {
        load_from_path(path)?
    } else if path == default_config_path() {
        info!(path = ?path, "no config file found; using built-in defaults");
        RawConfigFile::default()
    } else {
        return Err(HotrunError::ConfigError(format!(
            "config file {:?} does not exist",
            path
        )));
    };

    overrides.apply(&mut raw);
    ConfigFile::try_from(raw)
}

/// Default config location: `Hotrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Hotrun.toml")
}
