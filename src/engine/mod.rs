// src/engine/mod.rs

//! Rebuild-and-supervise engine.
//!
//! This module ties together:
//! - the pure control-loop state machine ([`core`])
//! - the stop → build → start sequence ([`orchestrator`])
//! - the async loop that owns the event channel ([`runtime`])
//! - the cloneable handle used by signal handlers and embedders ([`handle`])
//!
//! Every trigger (filesystem change, manual refresh, shutdown) goes through
//! one channel and is processed by one task, so rebuilds never overlap.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ConfigFile;
use crate::exec::{ExecutorBackend, ProcessSupervisor, StopPolicy};
use crate::watch::{ChangeClassifier, ChangeEvent, PathFilter};

pub mod core;
pub mod handle;
pub mod orchestrator;
pub mod runtime;

pub use self::core::{CoreCommand, CoreEngine, CoreStep};
pub use handle::EngineHandle;
pub use orchestrator::{RebuildOutcome, Rebuilder};
pub use runtime::Runtime;

/// Capacity of the engine input channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Why a rebuild was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Synthetic trigger queued at startup.
    FirstRun,
    /// A qualifying filesystem change.
    FileWatch,
    /// `EngineHandle::trigger_refresh`.
    Manual,
}

/// Events flowing into the control loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Raw change from the watcher; classified by the loop.
    FileChanged(ChangeEvent),
    /// The watcher reported an error. Logged, never fatal.
    WatcherError(String),
    /// Rebuild as if a qualifying change had happened.
    ManualRefresh,
    /// Stop the child and leave the loop.
    ShutdownRequested,
}

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Initializing,
    Running,
    ShuttingDown,
}

/// Wire up a runtime and its handle for `cfg`.
///
/// The caller decides whether to attach a watcher (via
/// [`EngineHandle::event_sender`]) before running the returned [`Runtime`].
pub fn build_engine(
    cfg: &ConfigFile,
    filter: Arc<PathFilter>,
    backend: Arc<dyn ExecutorBackend>,
) -> (Runtime, EngineHandle) {
    let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(EVENT_CHANNEL_CAPACITY);
    // Cleared by `EngineHandle::stop` and when the loop returns.
    let running = Arc::new(AtomicBool::new(true));

    let supervisor = Arc::new(ProcessSupervisor::new(
        Arc::clone(&backend),
        StopPolicy::from_config(cfg),
    ));

    let rebuilder = Rebuilder::new(
        backend,
        Arc::clone(&supervisor),
        cfg.build.cmd.clone(),
        cfg.run_command(),
        Arc::clone(&running),
    );

    let core = CoreEngine::new(ChangeClassifier::new(filter));
    let runtime = Runtime::new(
        core,
        event_rx,
        rebuilder,
        Arc::clone(&supervisor),
        Arc::clone(&running),
        cfg.build.delay,
    );
    let handle = EngineHandle::new(event_tx, supervisor, running);

    (runtime, handle)
}
