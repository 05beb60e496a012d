use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hotrun::config::ConfigFile;
use hotrun::engine::{build_engine, EngineHandle, Runtime};
use hotrun::errors::{HotrunError, Result};
use hotrun::exec::{ExecutorBackend, KillSignal, ProcessGroupHandle};
use hotrun::watch::PathFilter;

/// Everything the fake backend and its processes did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOp {
    Build(String),
    Spawn { pid: u32, cmd: String },
    SpawnFailed(String),
    SignalGroup { pid: u32, signal: KillSignal },
    SignalProcess { pid: u32, signal: KillSignal },
    Wait { pid: u32 },
}

/// How the next fake processes behave when signalled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBehaviour {
    /// `killpg` fails (as if the group were gone); direct signals still work.
    pub group_signal_fails: bool,
    /// Interrupts are delivered but ignored.
    pub ignores_interrupt: bool,
    /// The process is already gone: every signal fails, `wait` succeeds.
    pub already_exited: bool,
    /// `wait` fails.
    pub wait_fails: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    ops: Vec<FakeOp>,
    next_pid: u32,
    live: BTreeSet<u32>,
    /// Processes that exited by themselves, with their exit code.
    exited: BTreeMap<u32, i32>,
    max_live: usize,
    build_failures: VecDeque<bool>,
    fail_builds: bool,
    fail_spawns: bool,
    build_delay: Duration,
    behaviour: ProcessBehaviour,
}

/// A fake executor that:
/// - records every build, spawn, signal and wait
/// - hands out fake process handles that "exit" when killed or reaped
/// - tracks how many processes are alive at once.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        let exec = Self::default();
        exec.lock().next_pid = 1000;
        exec
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Every build fails until changed.
    pub fn fail_builds(&self, fail: bool) {
        self.lock().fail_builds = fail;
    }

    /// Script the outcome of upcoming builds (`true` = fail), consumed in order.
    pub fn script_builds(&self, failures: &[bool]) {
        self.lock().build_failures.extend(failures.iter().copied());
    }

    pub fn fail_spawns(&self, fail: bool) {
        self.lock().fail_spawns = fail;
    }

    pub fn set_build_delay(&self, delay: Duration) {
        self.lock().build_delay = delay;
    }

    pub fn set_behaviour(&self, behaviour: ProcessBehaviour) {
        self.lock().behaviour = behaviour;
    }

    pub fn ops(&self) -> Vec<FakeOp> {
        self.lock().ops.clone()
    }

    pub fn build_count(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, FakeOp::Build(_)))
            .count()
    }

    pub fn spawned_pids(&self) -> Vec<u32> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                FakeOp::Spawn { pid, .. } => Some(*pid),
                _ => None,
            })
            .collect()
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned_pids().len()
    }

    /// Make process `pid` exit by itself with `code`, as if the program
    /// finished or crashed.
    pub fn exit(&self, pid: u32, code: i32) {
        let mut st = self.lock();
        st.live.remove(&pid);
        st.exited.insert(pid, code);
    }

    pub fn live(&self) -> Vec<u32> {
        self.lock().live.iter().copied().collect()
    }

    pub fn max_live(&self) -> usize {
        self.lock().max_live
    }

    /// Hand out a fake process directly, for supervisor-level tests.
    pub fn process(&self, cmd: &str) -> FakeProcess {
        let mut st = self.lock();
        let pid = st.next_pid;
        st.next_pid += 1;
        st.live.insert(pid);
        st.max_live = st.max_live.max(st.live.len());
        st.ops.push(FakeOp::Spawn {
            pid,
            cmd: cmd.to_string(),
        });
        FakeProcess {
            pid,
            behaviour: st.behaviour,
            state: Arc::clone(&self.state),
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn run_build<'a>(
        &'a self,
        cmd: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let (fail, delay) = {
                let mut st = self.lock();
                st.ops.push(FakeOp::Build(cmd.to_string()));
                let scripted = st.build_failures.pop_front().unwrap_or(false);
                (st.fail_builds || scripted, st.build_delay)
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if fail {
                Err(HotrunError::BuildError(format!(
                    "'{cmd}' exited with status 1"
                )))
            } else {
                Ok(())
            }
        })
    }

    fn spawn_process(&self, cmd: &str) -> Result<Box<dyn ProcessGroupHandle>> {
        let mut st = self.lock();
        if st.fail_spawns {
            st.ops.push(FakeOp::SpawnFailed(cmd.to_string()));
            return Err(HotrunError::StartError(format!("spawning '{cmd}': not found")));
        }
        drop(st);
        Ok(Box::new(self.process(cmd)))
    }
}

/// Scripted process handle recording every call into the shared log.
#[derive(Debug)]
pub struct FakeProcess {
    pid: u32,
    behaviour: ProcessBehaviour,
    state: Arc<Mutex<FakeState>>,
}

fn no_such_process() -> io::Error {
    io::Error::from_raw_os_error(3)
}

impl FakeProcess {
    fn deliver(&mut self, signal: KillSignal) {
        let exits = match signal {
            KillSignal::Kill => true,
            KillSignal::Interrupt => !self.behaviour.ignores_interrupt,
        };
        if exits {
            self.state.lock().unwrap().live.remove(&self.pid);
        }
    }
}

impl ProcessGroupHandle for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn signal_group(&mut self, signal: KillSignal) -> io::Result<()> {
        self.state.lock().unwrap().ops.push(FakeOp::SignalGroup {
            pid: self.pid,
            signal,
        });
        if self.behaviour.already_exited || self.behaviour.group_signal_fails {
            return Err(no_such_process());
        }
        self.deliver(signal);
        Ok(())
    }

    fn signal_process(&mut self, signal: KillSignal) -> io::Result<()> {
        self.state.lock().unwrap().ops.push(FakeOp::SignalProcess {
            pid: self.pid,
            signal,
        });
        if self.behaviour.already_exited {
            return Err(no_such_process());
        }
        self.deliver(signal);
        Ok(())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut st = self.state.lock().unwrap();
            st.ops.push(FakeOp::Wait { pid: self.pid });
            if self.behaviour.wait_fails {
                return Err(io::Error::other("wait failed"));
            }
            st.live.remove(&self.pid);
            Ok(())
        })
    }

    fn try_reap(&mut self) -> io::Result<Option<String>> {
        let st = self.state.lock().unwrap();
        Ok(st
            .exited
            .get(&self.pid)
            .map(|code| format!("exit status: {code}")))
    }
}

/// Build an engine backed by a fresh `FakeExecutor`.
pub fn fake_engine(cfg: &ConfigFile) -> (Runtime, EngineHandle, FakeExecutor) {
    let exec = FakeExecutor::new();
    let filter = Arc::new(PathFilter::from_config(cfg).expect("filter from config"));
    let (runtime, handle) = build_engine(cfg, filter, Arc::new(exec.clone()));
    (runtime, handle, exec)
}
