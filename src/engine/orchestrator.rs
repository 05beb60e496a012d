// src/engine/orchestrator.rs

//! Stop-old → build → start-new.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::engine::TriggerReason;
use crate::exec::{ExecutorBackend, ProcessSupervisor};

/// Result of a single rebuild. Failures are already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Started { pid: u32 },
    BuildFailed,
    StartFailed,
    /// The build finished after a stop request; nothing was started.
    Cancelled,
}

/// Runs rebuilds for the control loop. Only the loop calls [`Rebuilder::rebuild`].
pub struct Rebuilder {
    backend: Arc<dyn ExecutorBackend>,
    supervisor: Arc<ProcessSupervisor>,
    build_cmd: String,
    run_cmd: String,
    running: Arc<AtomicBool>,
}

impl fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rebuilder")
            .field("build_cmd", &self.build_cmd)
            .field("run_cmd", &self.run_cmd)
            .finish_non_exhaustive()
    }
}

impl Rebuilder {
    pub fn new(
        backend: Arc<dyn ExecutorBackend>,
        supervisor: Arc<ProcessSupervisor>,
        build_cmd: String,
        run_cmd: String,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            backend,
            supervisor,
            build_cmd,
            run_cmd,
            running,
        }
    }

    pub async fn rebuild(&self, reason: TriggerReason) -> RebuildOutcome {
        debug!(?reason, "rebuild requested");

        if !self.running.load(Ordering::SeqCst) {
            debug!("engine stopped; skipping rebuild");
            return RebuildOutcome::Cancelled;
        }

        if let Err(err) = self.supervisor.stop_current().await {
            warn!(error = %err, "could not stop previous process");
        }

        info!("building...");
        if let Err(err) = self.backend.run_build(&self.build_cmd).await {
            error!("{err}");
            return RebuildOutcome::BuildFailed;
        }

        // A stop that arrived during the build wins over starting.
        if !self.running.load(Ordering::SeqCst) {
            debug!("engine stopped during build; not starting");
            return RebuildOutcome::Cancelled;
        }

        info!("running...");
        match self.supervisor.start(&self.run_cmd).await {
            Ok(pid) => RebuildOutcome::Started { pid },
            Err(err) => {
                error!("{err}");
                RebuildOutcome::StartFailed
            }
        }
    }
}
