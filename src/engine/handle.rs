// src/engine/handle.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::engine::EngineEvent;
use crate::errors::Result;
use crate::exec::ProcessSupervisor;

/// Cloneable control surface of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    event_tx: mpsc::Sender<EngineEvent>,
    supervisor: Arc<ProcessSupervisor>,
    running: Arc<AtomicBool>,
}

impl EngineHandle {
    pub(crate) fn new(
        event_tx: mpsc::Sender<EngineEvent>,
        supervisor: Arc<ProcessSupervisor>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            event_tx,
            supervisor,
            running,
        }
    }

    /// Queue a rebuild, exactly like a qualifying file change.
    ///
    /// Returns `false` if the loop is gone or its queue is full.
    pub fn trigger_refresh(&self) -> bool {
        match self.event_tx.try_send(EngineEvent::ManualRefresh) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("engine queue full; manual refresh dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("engine not running; manual refresh ignored");
                false
            }
        }
    }

    /// Kill the running child, ask the loop to exit and clear the running
    /// flag. Calling it more than once is harmless.
    pub async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        let stopped = self.supervisor.stop_current().await;

        if self
            .event_tx
            .send(EngineEvent::ShutdownRequested)
            .await
            .is_err()
        {
            debug!("engine loop already finished");
        }

        stopped.map(|_| ())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sender for feeding events (e.g. from a watcher) into the loop.
    pub fn event_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.event_tx.clone()
    }

    /// Pid of the supervised child, if one is running.
    pub async fn current_pid(&self) -> Option<u32> {
        self.supervisor.current_pid().await
    }
}
