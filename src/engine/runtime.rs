// src/engine/runtime.rs

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::exec::ProcessSupervisor;
use crate::watch::WatcherHandle;

use super::core::{CoreCommand, CoreEngine, CoreStep};
use super::orchestrator::{RebuildOutcome, Rebuilder};
use super::{EngineEvent, TriggerReason};

/// How often the loop checks whether the child exited on its own.
const REAP_INTERVAL: Duration = Duration::from_millis(250);

/// Async shell around [`CoreEngine`].
///
/// Reads `EngineEvent`s one at a time, feeds them to the core and executes
/// the resulting commands. It is the only caller of [`Rebuilder::rebuild`].
pub struct Runtime {
    core: CoreEngine,
    event_rx: mpsc::Receiver<EngineEvent>,
    rebuilder: Rebuilder,
    supervisor: Arc<ProcessSupervisor>,
    running: Arc<AtomicBool>,
    delay: Duration,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreEngine,
        event_rx: mpsc::Receiver<EngineEvent>,
        rebuilder: Rebuilder,
        supervisor: Arc<ProcessSupervisor>,
        running: Arc<AtomicBool>,
        delay: Duration,
    ) -> Self {
        Self {
            core,
            event_rx,
            rebuilder,
            supervisor,
            running,
            delay,
        }
    }

    /// Main event loop.
    ///
    /// `watcher` is kept alive until the loop ends and is dropped (closing
    /// the OS watches) before the child is stopped for the last time.
    pub async fn run(mut self, watcher: Option<WatcherHandle>) -> Result<()> {
        if let Some(w) = &watcher {
            debug!(dirs = w.registered(), "watcher attached");
        }

        let first = if self.running.load(Ordering::SeqCst) {
            self.core.start()
        } else {
            debug!("stopped before start; skipping first build");
            CoreStep::exit()
        };
        info!("hotrun engine started");

        let mut keep_running = self.execute_step(first).await;

        let mut reap_tick = tokio::time::interval(REAP_INTERVAL);
        reap_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while keep_running {
            let received = tokio::select! {
                received = self.event_rx.recv() => Some(received),
                _ = reap_tick.tick() => None,
            };

            let event = match received {
                Some(Some(e)) => e,
                Some(None) => {
                    info!("engine event channel closed; exiting");
                    break;
                }
                None => {
                    self.supervisor.reap_exited().await;
                    continue;
                }
            };

            let mut step = self.step(event);

            if step.keep_running && step.rebuild_reason() == Some(TriggerReason::FileWatch) {
                self.coalesce(&mut step).await;
            }

            keep_running = self.execute_step(step).await;
        }

        info!("shutting down");
        drop(watcher);

        if let Err(err) = self.supervisor.stop_current().await {
            error!(error = %err, "failed to stop process during shutdown");
        }
        self.running.store(false, Ordering::SeqCst);
        self.event_rx.close();

        info!("engine exited");
        Ok(())
    }

    fn step(&mut self, event: EngineEvent) -> CoreStep {
        match &event {
            EngineEvent::FileChanged(change) => {
                debug!(path = ?change.path, kind = ?change.kind, "file event")
            }
            EngineEvent::WatcherError(msg) => warn!("watcher error: {msg}"),
            other => debug!(event = ?other, "engine received event"),
        }
        self.core.step(event)
    }

    /// Wait out the debounce window, then fold in whatever is already queued.
    ///
    /// Further changes collapse into the pending rebuild; a shutdown request
    /// replaces it.
    async fn coalesce(&mut self, step: &mut CoreStep) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut folded = 0usize;
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    let next = self.step(event);
                    step.merge(next);
                    folded += 1;
                    if !step.keep_running {
                        break;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if folded > 0 {
            debug!(folded, "coalesced queued events into pending rebuild");
        }
    }

    /// Execute every command of `step`; returns whether to keep running.
    async fn execute_step(&mut self, step: CoreStep) -> bool {
        for command in step.commands {
            self.execute_command(command).await;
        }
        if !step.keep_running {
            debug!("core requested exit");
        }
        step.keep_running
    }

    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::Rebuild(reason) => match self.rebuilder.rebuild(reason).await {
                RebuildOutcome::Started { pid } => debug!(pid, ?reason, "rebuild complete"),
                outcome => debug!(?outcome, ?reason, "rebuild did not start a process"),
            },
            CoreCommand::StopChild => {
                if let Err(err) = self.supervisor.stop_current().await {
                    error!(error = %err, "failed to stop process");
                }
            }
        }
    }
}
