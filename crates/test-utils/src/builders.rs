#![allow(dead_code)]

use hotrun::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with the given build command and
/// binary; delays default to zero so tests don't sleep unless asked to.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(cmd: &str, bin: &str) -> Self {
        let mut config = RawConfigFile::default();
        config.build.cmd = cmd.to_string();
        config.build.bin = bin.to_string();
        config.build.kill_delay = "0".to_string();
        config.build.delay = "0".to_string();
        Self { config }
    }

    pub fn root(mut self, root: impl AsRef<std::path::Path>) -> Self {
        self.config.root = root.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn tmp_dir(mut self, dir: &str) -> Self {
        self.config.tmp_dir = dir.to_string();
        self
    }

    pub fn full_bin(mut self, cmd: &str) -> Self {
        self.config.build.full_bin = Some(cmd.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.config.build.args_bin.push(arg.to_string());
        self
    }

    pub fn include_dir(mut self, dir: &str) -> Self {
        self.config.build.include_dir.push(dir.to_string());
        self
    }

    pub fn exclude_dir(mut self, dir: &str) -> Self {
        self.config.build.exclude_dir.push(dir.to_string());
        self
    }

    /// Replace the extension list.
    pub fn include_ext(mut self, exts: &[&str]) -> Self {
        self.config.build.include_ext = exts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn include_file(mut self, suffix: &str) -> Self {
        self.config.build.include_file.push(suffix.to_string());
        self
    }

    pub fn exclude_file(mut self, suffix: &str) -> Self {
        self.config.build.exclude_file.push(suffix.to_string());
        self
    }

    pub fn exclude_glob(mut self, pattern: &str) -> Self {
        self.config.build.exclude_glob.push(pattern.to_string());
        self
    }

    pub fn exclude_regex(mut self, pattern: &str) -> Self {
        self.config.build.exclude_regex.push(pattern.to_string());
        self
    }

    pub fn send_interrupt(mut self, val: bool) -> Self {
        self.config.build.send_interrupt = val;
        self
    }

    pub fn kill_delay(mut self, delay: &str) -> Self {
        self.config.build.kill_delay = delay.to_string();
        self
    }

    pub fn delay(mut self, delay: &str) -> Self {
        self.config.build.delay = delay.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
