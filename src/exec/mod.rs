// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] builds platform shell commands (with a fresh process group
//!   on Unix).
//! - [`process`] defines the `ProcessGroupHandle` capability and the real
//!   shell-backed implementation.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests replace it with a fake.
//! - [`supervisor`] owns the single running child and the stop escalation.

pub mod backend;
pub mod command;
pub mod process;
pub mod supervisor;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use process::{ChildProcess, KillSignal, ProcessGroupHandle, ShellProcess};
pub use supervisor::{escalate, ProcessSupervisor, StopPolicy};
