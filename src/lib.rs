// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod signals;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_config, ConfigFile};
use crate::engine::build_engine;
use crate::exec::RealExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{spawn_watcher, PathFilter, WatchSet};

/// Make `root` absolute and free of symlinks, so that event paths reported
/// by the OS watcher relate to it.
pub fn resolve_root(fs: &dyn FileSystem, root: &Path) -> Result<PathBuf> {
    fs.canonicalize(root)
        .with_context(|| format!("resolving project root {:?}", root))
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - path filter and the one-time directory walk
/// - the engine and its file watcher
/// - signal handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_config(&config_path, &args.overrides())?;

    cfg.root = resolve_root(&RealFileSystem, &cfg.root)?;
    debug!(root = ?cfg.root, "project root resolved");

    let filter = Arc::new(PathFilter::from_config(&cfg)?);
    let watch_set = WatchSet::build(&RealFileSystem, &filter)?;

    if args.dry_run {
        print_dry_run(&cfg, &watch_set);
        return Ok(());
    }

    let backend = Arc::new(RealExecutorBackend::new(cfg.root.clone()));
    let (runtime, handle) = build_engine(&cfg, filter, backend);

    let watcher = spawn_watcher(&watch_set, handle.event_sender())?;
    let _signals = signals::spawn_signal_listener(handle.clone());

    info!(
        build = %cfg.build.cmd,
        run = %cfg.run_command(),
        "watching {} directories",
        watcher.registered()
    );

    runtime.run(Some(watcher)).await?;
    Ok(())
}

/// Print the resolved configuration and watched directories.
fn print_dry_run(cfg: &ConfigFile, watch_set: &WatchSet) {
    println!("hotrun dry-run");
    println!("  root = {}", cfg.root.display());
    println!("  tmp_dir = {}", cfg.tmp_dir.display());
    println!();

    let build = &cfg.build;
    println!("build:");
    println!("  cmd: {}", build.cmd);
    println!("  run: {}", cfg.run_command());
    println!("  include_ext: {:?}", build.include_ext);
    if !build.include_dir.is_empty() {
        println!("  include_dir: {:?}", build.include_dir);
    }
    if !build.exclude_dir.is_empty() {
        println!("  exclude_dir: {:?}", build.exclude_dir);
    }
    if !build.include_file.is_empty() {
        println!("  include_file: {:?}", build.include_file);
    }
    if !build.exclude_file.is_empty() {
        println!("  exclude_file: {:?}", build.exclude_file);
    }
    if !build.exclude_glob.is_empty() {
        println!("  exclude_glob: {:?}", build.exclude_glob);
    }
    if !build.exclude_regex.is_empty() {
        println!("  exclude_regex: {:?}", build.exclude_regex);
    }
    println!("  send_interrupt: {}", build.send_interrupt);
    println!("  kill_delay: {:?}", build.kill_delay);
    println!("  delay: {:?}", build.delay);
    println!();

    println!("watched directories ({}):", watch_set.len());
    for dir in watch_set.iter() {
        let shown = dir.strip_prefix(watch_set.root()).unwrap_or(dir);
        if shown.as_os_str().is_empty() {
            println!("  - .");
        } else {
            println!("  - {}", shown.display());
        }
    }

    debug!("dry-run complete (no execution)");
}
