// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every override flag maps onto one field of the `[build]` section (or the
//! top-level `root`). Overrides are applied before validation, so a project
//! without a config file can be driven entirely from the command line.

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Command-line arguments for `hotrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "hotrun",
    version,
    about = "Rebuild and restart a program whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Hotrun.toml` in the current working directory. When the
    /// default file is missing, built-in defaults plus CLI overrides are used.
    #[arg(long, short = 'c', value_name = "PATH", default_value = "Hotrun.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `HOTRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration and watched directories, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Project root to watch (overrides `root`).
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Build command (overrides `build.cmd`).
    #[arg(long, value_name = "CMD")]
    pub build_cmd: Option<String>,

    /// Binary produced by the build (overrides `build.bin`).
    #[arg(long, value_name = "PATH")]
    pub bin: Option<String>,

    /// Send an interrupt before killing the program (overrides `build.send_interrupt`).
    #[arg(long, value_name = "BOOL")]
    pub send_interrupt: Option<bool>,

    /// Delay between interrupt and kill, e.g. `500ms` (overrides `build.kill_delay`).
    #[arg(long, value_name = "DURATION")]
    pub kill_delay: Option<String>,
}

impl CliArgs {
    /// Collect the config overrides given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root: self.root.clone(),
            build_cmd: self.build_cmd.clone(),
            bin: self.bin.clone(),
            send_interrupt: self.send_interrupt,
            kill_delay: self.kill_delay.clone(),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
