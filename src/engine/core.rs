// src/engine/core.rs

//! Pure control-loop state machine.
//!
//! `CoreEngine` consumes [`EngineEvent`]s and returns the commands the async
//! shell (`engine::runtime::Runtime`) should execute. It has no channels, no
//! processes and no Tokio types, so every transition can be tested directly.

use crate::engine::{EngineEvent, EnginePhase, TriggerReason};
use crate::watch::ChangeClassifier;

/// Command produced by the core, executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Stop the old child, build, start the new child.
    Rebuild(TriggerReason),
    /// Stop the child without starting another one.
    StopChild,
}

/// Decision returned after handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn rebuild(reason: TriggerReason) -> Self {
        Self {
            commands: vec![CoreCommand::Rebuild(reason)],
            keep_running: true,
        }
    }

    pub fn exit() -> Self {
        Self {
            commands: vec![CoreCommand::StopChild],
            keep_running: false,
        }
    }

    /// Reason of the pending rebuild, if this step requests one.
    pub fn rebuild_reason(&self) -> Option<TriggerReason> {
        self.commands.iter().find_map(|c| match c {
            CoreCommand::Rebuild(reason) => Some(*reason),
            CoreCommand::StopChild => None,
        })
    }

    /// Fold a later step into this one.
    ///
    /// Rebuild requests collapse into the first one. A step that ends the loop
    /// replaces everything pending, so a shutdown cancels a queued rebuild.
    pub fn merge(&mut self, later: CoreStep) {
        if !self.keep_running {
            return;
        }
        if !later.keep_running {
            *self = later;
            return;
        }
        for command in later.commands {
            let duplicate_rebuild =
                matches!(command, CoreCommand::Rebuild(_)) && self.rebuild_reason().is_some();
            if !duplicate_rebuild && !self.commands.contains(&command) {
                self.commands.push(command);
            }
        }
    }
}

/// Control-loop state: phase plus the classifier used for file events.
#[derive(Debug)]
pub struct CoreEngine {
    phase: EnginePhase,
    classifier: ChangeClassifier,
}

impl CoreEngine {
    pub fn new(classifier: ChangeClassifier) -> Self {
        Self {
            phase: EnginePhase::Initializing,
            classifier,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Leave `Initializing` and queue the first build.
    ///
    /// Calling it again once running does nothing.
    pub fn start(&mut self) -> CoreStep {
        match self.phase {
            EnginePhase::Initializing => {
                self.phase = EnginePhase::Running;
                CoreStep::rebuild(TriggerReason::FirstRun)
            }
            EnginePhase::Running => CoreStep::idle(),
            EnginePhase::ShuttingDown => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// Handle one event.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        if self.phase == EnginePhase::ShuttingDown {
            return CoreStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        match event {
            EngineEvent::ShutdownRequested => {
                self.phase = EnginePhase::ShuttingDown;
                CoreStep::exit()
            }
            // Nothing is built before the first run has been queued.
            _ if self.phase == EnginePhase::Initializing => CoreStep::idle(),
            EngineEvent::FileChanged(change) => {
                if self.classifier.is_qualifying_change(&change) {
                    CoreStep::rebuild(TriggerReason::FileWatch)
                } else {
                    CoreStep::idle()
                }
            }
            EngineEvent::WatcherError(_) => CoreStep::idle(),
            EngineEvent::ManualRefresh => CoreStep::rebuild(TriggerReason::Manual),
        }
    }
}
