// src/config/validate.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::Glob;
use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::{BuildConfig, ConfigFile, RawConfigFile};
use crate::errors::{HotrunError, Result};
use crate::watch::path_utils::clean_path;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = HotrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let build = &raw.build;
        let kill_delay = duration_field("build.kill_delay", &build.kill_delay)?;
        let delay = duration_field("build.delay", &build.delay)?;

        let include_ext: BTreeSet<String> = build
            .include_ext
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();

        let include_dir: Vec<PathBuf> = build
            .include_dir
            .iter()
            .map(|d| clean_path(Path::new(d.trim())))
            .collect();

        Ok(ConfigFile {
            root: PathBuf::from(raw.root.trim()),
            tmp_dir: clean_path(Path::new(raw.tmp_dir.trim())),
            build: BuildConfig {
                cmd: build.cmd.trim().to_string(),
                bin: build.bin.trim().to_string(),
                full_bin: build.full_bin.clone(),
                args_bin: build.args_bin.clone(),
                include_dir,
                exclude_dir: build.exclude_dir.clone(),
                include_ext,
                include_file: build.include_file.clone(),
                exclude_file: build.exclude_file.clone(),
                exclude_glob: build.exclude_glob.clone(),
                exclude_regex: build.exclude_regex.clone(),
                send_interrupt: build.send_interrupt,
                kill_delay,
                delay,
            },
        })
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_root(cfg)?;
    ensure_build_command(cfg)?;
    ensure_run_command(cfg)?;
    ensure_something_is_watched(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn ensure_root(cfg: &RawConfigFile) -> Result<()> {
    if cfg.root.trim().is_empty() {
        return Err(HotrunError::ConfigError("`root` must not be empty".to_string()));
    }
    if cfg.tmp_dir.trim().is_empty() {
        return Err(HotrunError::ConfigError(
            "`tmp_dir` must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn ensure_build_command(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.cmd.trim().is_empty() {
        return Err(HotrunError::ConfigError(
            "[build].cmd must be set (or pass --build-cmd)".to_string(),
        ));
    }
    Ok(())
}

fn ensure_run_command(cfg: &RawConfigFile) -> Result<()> {
    let has_full_bin = cfg
        .build
        .full_bin
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());

    if !has_full_bin && cfg.build.bin.trim().is_empty() {
        return Err(HotrunError::ConfigError(
            "[build].bin or [build].full_bin must be set (or pass --bin)".to_string(),
        ));
    }
    Ok(())
}

fn ensure_something_is_watched(cfg: &RawConfigFile) -> Result<()> {
    let any_ext = cfg
        .build
        .include_ext
        .iter()
        .any(|e| !e.trim().trim_start_matches('.').is_empty());

    if !any_ext && cfg.build.include_file.is_empty() {
        return Err(HotrunError::ConfigError(
            "[build].include_ext and [build].include_file are both empty; no change would ever trigger a rebuild"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for pat in &cfg.build.exclude_glob {
        Glob::new(pat).map_err(|e| {
            HotrunError::ConfigError(format!("invalid [build].exclude_glob pattern '{pat}': {e}"))
        })?;
    }
    for pat in &cfg.build.exclude_regex {
        Regex::new(pat).map_err(|e| {
            HotrunError::ConfigError(format!("invalid [build].exclude_regex pattern '{pat}': {e}"))
        })?;
    }
    Ok(())
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| HotrunError::ConfigError(format!("{name}: {e}")))
}
