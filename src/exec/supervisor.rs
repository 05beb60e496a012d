// src/exec/supervisor.rs

//! Lifecycle of the single supervised child process.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{HotrunError, Result};
use crate::exec::backend::ExecutorBackend;
use crate::exec::process::ChildProcess;

/// How a running child is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    /// Interrupt the group first and give it `kill_delay` to exit.
    pub send_interrupt: bool,
    pub kill_delay: Duration,
}

impl StopPolicy {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            send_interrupt: cfg.build.send_interrupt,
            kill_delay: cfg.build.kill_delay,
        }
    }
}

/// Owns at most one running child.
///
/// The slot is guarded by an async mutex that is held only while a child is
/// being started or stopped, never across a build.
pub struct ProcessSupervisor {
    backend: Arc<dyn ExecutorBackend>,
    policy: StopPolicy,
    current: Mutex<Option<ChildProcess>>,
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(backend: Arc<dyn ExecutorBackend>, policy: StopPolicy) -> Self {
        Self {
            backend,
            policy,
            current: Mutex::new(None),
        }
    }

    /// Start `command` as the supervised child and return its pid.
    ///
    /// A child still occupying the slot is stopped first, under the same
    /// lock, so two children are never registered at once.
    pub async fn start(&self, command: &str) -> Result<u32> {
        let mut slot = self.current.lock().await;
        reap_slot(&mut slot);

        if let Some(mut previous) = slot.take() {
            warn!(
                pid = previous.pid(),
                "previous process still registered; stopping it before starting a new one"
            );
            if let Err(err) = escalate(&mut previous, &self.policy).await {
                warn!(error = %err, "failed to stop previous process");
            }
        }

        debug!(cmd = %command, "starting command");
        let handle = self.backend.spawn_process(command)?;
        let child = ChildProcess::new(handle);
        let pid = child.pid();
        *slot = Some(child);

        Ok(pid)
    }

    /// Stop the current child, if any, and clear the slot.
    ///
    /// Returns the pid that was stopped; `Ok(None)` when nothing was running
    /// (including a child that already exited on its own), which makes
    /// repeated stops harmless.
    pub async fn stop_current(&self) -> Result<Option<u32>> {
        let mut slot = self.current.lock().await;
        reap_slot(&mut slot);
        let Some(mut child) = slot.take() else {
            debug!("no running process to stop");
            return Ok(None);
        };

        let pid = child.pid();
        escalate(&mut child, &self.policy).await?;
        Ok(Some(pid))
    }

    /// Pid of the current child, if one is registered and still running.
    pub async fn current_pid(&self) -> Option<u32> {
        let mut slot = self.current.lock().await;
        reap_slot(&mut slot);
        slot.as_ref().map(ChildProcess::pid)
    }

    pub async fn has_child(&self) -> bool {
        self.current_pid().await.is_some()
    }

    /// Clear the slot if the child exited on its own, logging its status.
    ///
    /// Returns the pid that was reaped.
    pub async fn reap_exited(&self) -> Option<u32> {
        let mut slot = self.current.lock().await;
        reap_slot(&mut slot)
    }
}

fn reap_slot(slot: &mut Option<ChildProcess>) -> Option<u32> {
    let child = slot.as_mut()?;
    let pid = child.pid();
    match child.handle_mut().try_reap() {
        Ok(Some(status)) => {
            info!(pid, uptime = ?child.uptime(), "process exited on its own ({status})");
            *slot = None;
            Some(pid)
        }
        Ok(None) => None,
        Err(err) => {
            debug!(pid, error = %err, "could not check whether process exited");
            None
        }
    }
}

/// Stop a child with the interrupt → delay → kill escalation, then reap it.
///
/// 1. With `send_interrupt`, interrupt the group (falling back to the pid)
///    and, if that was delivered, wait `kill_delay`.
/// 2. Kill the group (falling back to the pid), whatever happened in 1.
/// 3. Wait for the process so no zombie is left behind.
///
/// A process that had already exited is not an error: every signal fails
/// but the reap succeeds. `KillError` is only returned when every signal
/// failed *and* the process could not be reaped.
pub async fn escalate(child: &mut ChildProcess, policy: &StopPolicy) -> Result<()> {
    let pid = child.pid();
    let pgid = child.pgid();
    info!(pid, uptime = ?child.uptime(), "killing process {pid}");

    let handle = child.handle_mut();

    let mut interrupt_error = None;
    if policy.send_interrupt {
        debug!(pid, pgid, "sending interrupt signal to process group");
        match handle.interrupt() {
            Ok(()) => {
                if !policy.kill_delay.is_zero() {
                    debug!(pid, delay = ?policy.kill_delay, "waiting before kill");
                    sleep(policy.kill_delay).await;
                }
            }
            Err(err) => {
                debug!(pid, error = %err, "interrupt could not be delivered");
                interrupt_error = Some(err);
            }
        }
    }

    debug!(pid, pgid, "sending kill signal to process group");
    let kill_result = handle.force_kill();
    if let Err(err) = &kill_result {
        debug!(pid, error = %err, "kill could not be delivered");
    }

    debug!(pid, "waiting for process to exit");
    let wait_result = handle.wait().await;

    let every_signal_failed =
        kill_result.is_err() && (!policy.send_interrupt || interrupt_error.is_some());

    match (wait_result, kill_result) {
        (Ok(()), _) if every_signal_failed => {
            debug!(pid, "process had already exited");
            Ok(())
        }
        (Ok(()), _) => Ok(()),
        (Err(wait_err), Err(kill_err)) if every_signal_failed => Err(HotrunError::KillError(
            format!("pid {pid}: {kill_err}; reaping also failed: {wait_err}"),
        )),
        (Err(wait_err), _) => {
            warn!(pid, error = %wait_err, "failed to reap process");
            Ok(())
        }
    }
}
