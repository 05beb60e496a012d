// src/exec/process.rs

//! Process-group capability used by the supervisor.
//!
//! On Unix a supervised program runs as the leader of its own process group,
//! so signalling the group reaches every descendant. Platforms without
//! process groups fall back to killing the direct child.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tracing::debug;

/// Signals used while stopping a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSignal {
    /// Polite request to exit (SIGINT).
    Interrupt,
    /// Forceful, uncatchable kill (SIGKILL).
    Kill,
}

/// A started program that can be signalled as a group and reaped.
pub trait ProcessGroupHandle: Send + fmt::Debug {
    fn pid(&self) -> u32;

    /// Process-group id. Equal to the pid for a group leader.
    fn pgid(&self) -> u32 {
        self.pid()
    }

    /// Signal the whole process group.
    fn signal_group(&mut self, signal: KillSignal) -> io::Result<()>;

    /// Signal only the process itself.
    fn signal_process(&mut self, signal: KillSignal) -> io::Result<()>;

    /// Wait for the process to exit and release its OS resources.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>>;

    /// Reap the process if it has already exited, without blocking.
    ///
    /// Returns a description of the exit status, or `None` while it runs.
    fn try_reap(&mut self) -> io::Result<Option<String>>;

    /// Interrupt the group, falling back to the process if the group is gone.
    fn interrupt(&mut self) -> io::Result<()> {
        self.signal_group(KillSignal::Interrupt).or_else(|err| {
            debug!(pid = self.pid(), error = %err, "group interrupt failed; signalling pid");
            self.signal_process(KillSignal::Interrupt)
        })
    }

    /// Kill the group, falling back to the process if the group is gone.
    fn force_kill(&mut self) -> io::Result<()> {
        self.signal_group(KillSignal::Kill).or_else(|err| {
            debug!(pid = self.pid(), error = %err, "group kill failed; killing pid");
            self.signal_process(KillSignal::Kill)
        })
    }
}

/// A program started through the platform shell.
#[derive(Debug)]
pub struct ShellProcess {
    child: Child,
    pid: u32,
}

impl ShellProcess {
    pub fn new(child: Child, pid: u32) -> Self {
        Self { child, pid }
    }
}

impl ProcessGroupHandle for ShellProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn signal_group(&mut self, signal: KillSignal) -> io::Result<()> {
        sys::signal_group(self.pid, signal)
    }

    fn signal_process(&mut self, signal: KillSignal) -> io::Result<()> {
        match sys::signal_process(self.pid, signal) {
            Err(e) if e.kind() == io::ErrorKind::Unsupported && signal == KillSignal::Kill => {
                self.child.start_kill()
            }
            other => other,
        }
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async move { self.child.wait().await.map(|_| ()) })
    }

    fn try_reap(&mut self) -> io::Result<Option<String>> {
        Ok(self.child.try_wait()?.map(|status| status.to_string()))
    }
}

#[cfg(unix)]
mod sys {
    use std::io;

    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    use super::KillSignal;

    fn to_nix(signal: KillSignal) -> Signal {
        match signal {
            KillSignal::Interrupt => Signal::SIGINT,
            KillSignal::Kill => Signal::SIGKILL,
        }
    }

    fn to_pid(pid: u32) -> io::Result<Pid> {
        i32::try_from(pid)
            .map(Pid::from_raw)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))
    }

    pub(super) fn signal_group(pgid: u32, signal: KillSignal) -> io::Result<()> {
        killpg(to_pid(pgid)?, to_nix(signal)).map_err(io::Error::from)
    }

    pub(super) fn signal_process(pid: u32, signal: KillSignal) -> io::Result<()> {
        kill(to_pid(pid)?, to_nix(signal)).map_err(io::Error::from)
    }
}

#[cfg(not(unix))]
mod sys {
    use std::io;

    use super::KillSignal;

    pub(super) fn signal_group(_pgid: u32, _signal: KillSignal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process groups are not supported on this platform",
        ))
    }

    pub(super) fn signal_process(_pid: u32, _signal: KillSignal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signals are not supported on this platform",
        ))
    }
}

/// The single supervised child, as stored by the supervisor.
///
/// The handle itself never leaves the `exec` module.
#[derive(Debug)]
pub struct ChildProcess {
    pid: u32,
    pgid: u32,
    started_at: Instant,
    handle: Box<dyn ProcessGroupHandle>,
}

impl ChildProcess {
    pub(crate) fn new(handle: Box<dyn ProcessGroupHandle>) -> Self {
        Self {
            pid: handle.pid(),
            pgid: handle.pgid(),
            started_at: Instant::now(),
            handle,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn pgid(&self) -> u32 {
        self.pgid
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn handle_mut(&mut self) -> &mut dyn ProcessGroupHandle {
        self.handle.as_mut()
    }
}
