// src/config/model.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// root = "."
/// tmp_dir = "tmp"
///
/// [build]
/// cmd = "cargo build"
/// bin = "target/debug/server"
/// args_bin = ["--port", "8080"]
/// include_ext = ["rs", "toml"]
/// exclude_dir = ["assets"]
/// exclude_glob = ["*_generated.rs"]
/// send_interrupt = true
/// kill_delay = "500ms"
/// ```
///
/// Everything is optional at the TOML level; validation (see
/// `validate.rs`) turns this into a [`ConfigFile`] and rejects anything the
/// engine could not run with.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Project root that is walked for watch directories and used as the
    /// working directory of the build and run commands.
    #[serde(default = "default_root")]
    pub root: String,

    /// Scratch directory for build output, relative to `root`.
    ///
    /// Always excluded from watching so a build never re-triggers itself.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,

    /// The `[build]` section.
    #[serde(default)]
    pub build: BuildSection,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_tmp_dir() -> String {
    "tmp".to_string()
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            root: default_root(),
            tmp_dir: default_tmp_dir(),
            build: BuildSection::default(),
        }
    }
}

/// `[build]` section, as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Shell command that builds the program.
    #[serde(default)]
    pub cmd: String,

    /// Path of the binary produced by `cmd`.
    #[serde(default)]
    pub bin: String,

    /// Full command line used to start the program.
    ///
    /// Takes precedence over `bin` + `args_bin` when set.
    #[serde(default)]
    pub full_bin: Option<String>,

    /// Arguments appended to `bin` when starting it.
    #[serde(default)]
    pub args_bin: Vec<String>,

    /// Directories to watch. Empty means "everything under root".
    #[serde(default)]
    pub include_dir: Vec<String>,

    /// Extra directories to skip, by base name or root-relative path.
    #[serde(default)]
    pub exclude_dir: Vec<String>,

    /// File extensions that trigger a rebuild (`"rs"` or `".rs"`).
    #[serde(default = "default_include_ext")]
    pub include_ext: Vec<String>,

    /// File-name suffixes that trigger a rebuild regardless of extension.
    #[serde(default)]
    pub include_file: Vec<String>,

    /// File-name suffixes that never trigger a rebuild.
    #[serde(default)]
    pub exclude_file: Vec<String>,

    /// Glob patterns matched against a file's base name.
    #[serde(default)]
    pub exclude_glob: Vec<String>,

    /// Regular expressions matched against a file's base name.
    #[serde(default)]
    pub exclude_regex: Vec<String>,

    /// Send an interrupt to the process group before killing it.
    #[serde(default)]
    pub send_interrupt: bool,

    /// How long to wait between interrupt and kill (e.g. `"500ms"`).
    #[serde(default = "default_kill_delay")]
    pub kill_delay: String,

    /// Debounce window for filesystem-triggered rebuilds (e.g. `"100ms"`).
    #[serde(default = "default_delay")]
    pub delay: String,
}

fn default_include_ext() -> Vec<String> {
    vec!["rs".to_string()]
}

fn default_kill_delay() -> String {
    "500ms".to_string()
}

fn default_delay() -> String {
    "100ms".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: String::new(),
            bin: String::new(),
            full_bin: None,
            args_bin: Vec::new(),
            include_dir: Vec::new(),
            exclude_dir: Vec::new(),
            include_ext: default_include_ext(),
            include_file: Vec::new(),
            exclude_file: Vec::new(),
            exclude_glob: Vec::new(),
            exclude_regex: Vec::new(),
            send_interrupt: false,
            kill_delay: default_kill_delay(),
            delay: default_delay(),
        }
    }
}

/// Validated configuration consumed by the engine.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so every pattern in
/// here is known to compile and every duration is already parsed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub root: PathBuf,
    /// Relative to `root`, already cleaned.
    pub tmp_dir: PathBuf,
    pub build: BuildConfig,
}

/// Validated `[build]` section.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub cmd: String,
    pub bin: String,
    pub full_bin: Option<String>,
    pub args_bin: Vec<String>,
    /// Cleaned, root-relative include directories.
    pub include_dir: Vec<PathBuf>,
    pub exclude_dir: Vec<String>,
    /// Extensions without the leading dot.
    pub include_ext: BTreeSet<String>,
    pub include_file: Vec<String>,
    pub exclude_file: Vec<String>,
    pub exclude_glob: Vec<String>,
    pub exclude_regex: Vec<String>,
    pub send_interrupt: bool,
    pub kill_delay: Duration,
    pub delay: Duration,
}

impl ConfigFile {
    /// Command line used to start the freshly built program.
    pub fn run_command(&self) -> String {
        match self.build.full_bin.as_deref() {
            Some(full) if !full.trim().is_empty() => full.to_string(),
            _ => {
                let mut cmd = self.build.bin.clone();
                for arg in &self.build.args_bin {
                    cmd.push(' ');
                    cmd.push_str(arg);
                }
                cmd
            }
        }
    }

    /// Absolute (or root-joined) location of the tmp directory.
    pub fn tmp_path(&self) -> PathBuf {
        self.root.join(&self.tmp_dir)
    }
}
