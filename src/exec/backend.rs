// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The orchestrator and the supervisor talk to an `ExecutorBackend` instead
//! of spawning processes themselves. Production uses [`RealExecutorBackend`];
//! tests swap in a fake that records builds and hands out scripted process
//! handles.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::errors::{HotrunError, Result};
use crate::exec::command::shell_command;
use crate::exec::process::{ProcessGroupHandle, ShellProcess};

/// Lines of build stderr quoted in a `BuildError`.
const STDERR_TAIL_LINES: usize = 5;

/// Trait abstracting how builds run and programs start.
pub trait ExecutorBackend: Send + Sync {
    /// Run the build command to completion.
    ///
    /// Returns `BuildError` on spawn failure or non-zero exit.
    fn run_build<'a>(
        &'a self,
        cmd: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Start the program in a new process group without waiting for it.
    ///
    /// Returns `StartError` if it cannot be spawned.
    fn spawn_process(&self, cmd: &str) -> Result<Box<dyn ProcessGroupHandle>>;
}

/// Real executor backend used in production.
///
/// Both commands run through the platform shell with `root` as working
/// directory. The program inherits our stdout/stderr so its output shows up
/// live; the build's stderr is echoed live and its tail kept for the error.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    root: PathBuf,
}

impl RealExecutorBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn run_build<'a>(
        &'a self,
        cmd: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            debug!(cmd = %cmd, "running build command");

            let mut command = shell_command(cmd, &self.root, false);
            command
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = command
                .spawn()
                .map_err(|e| HotrunError::BuildError(format!("spawning '{cmd}': {e}")))?;

            let stderr = child.stderr.take();
            let tail_task = tokio::spawn(async move {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                if let Some(stderr) = stderr {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        eprintln!("{line}");
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
                tail
            });

            let status = child
                .wait()
                .await
                .map_err(|e| HotrunError::BuildError(format!("waiting for '{cmd}': {e}")))?;
            let tail = tail_task.await.unwrap_or_default();

            if status.success() {
                return Ok(());
            }

            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let mut message = format!("'{cmd}' exited with status {code}");
            if !tail.is_empty() {
                message.push_str(": ");
                message.push_str(&Vec::from(tail).join(" | "));
            }
            Err(HotrunError::BuildError(message))
        })
    }

    fn spawn_process(&self, cmd: &str) -> Result<Box<dyn ProcessGroupHandle>> {
        let mut command = shell_command(cmd, &self.root, true);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| HotrunError::StartError(format!("spawning '{cmd}': {e}")))?;

        let pid = child.id().ok_or_else(|| {
            HotrunError::StartError(format!("'{cmd}' exited before its pid was known"))
        })?;

        info!(pid, cmd = %cmd, "process started");
        Ok(Box::new(ShellProcess::new(child, pid)))
    }
}
