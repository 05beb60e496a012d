// tests/runtime_fake_executor.rs

use std::error::Error;
use std::time::Duration;

use tokio::time::timeout;

use hotrun::engine::EngineEvent;
use hotrun::exec::KillSignal;
use hotrun::watch::{ChangeEvent, ChangeKind};
use hotrun_test_utils::builders::ConfigBuilder;
use hotrun_test_utils::fake_executor::{fake_engine, FakeOp};
use hotrun_test_utils::{capture_logs, init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const WAIT: Duration = Duration::from_secs(2);

fn write(path: &str) -> EngineEvent {
    EngineEvent::FileChanged(ChangeEvent::new(path, ChangeKind::Write))
}

fn position(ops: &[FakeOp], want: &FakeOp) -> usize {
    ops.iter()
        .position(|op| op == want)
        .unwrap_or_else(|| panic!("{want:?} not found in {ops:?}"))
}

#[tokio::test]
async fn first_run_builds_and_starts_once() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("cargo build", "target/debug/app")
        .arg("--verbose")
        .build();
    let (runtime, handle, exec) = fake_engine(&cfg);

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);
    assert!(handle.is_running());

    let pid = exec.spawned_pids()[0];
    assert_eq!(
        exec.ops()[..2],
        [
            FakeOp::Build("cargo build".into()),
            FakeOp::Spawn {
                pid,
                cmd: "target/debug/app --verbose".into()
            },
        ]
    );
    assert_eq!(handle.current_pid().await, Some(pid));

    handle.stop().await?;
    timeout(WAIT, task).await???;

    assert!(!handle.is_running());
    assert!(exec.live().is_empty());
    assert_eq!(exec.build_count(), 1);
    Ok(())
}

#[tokio::test]
async fn change_stops_old_child_before_building_and_starting() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);
    let first = exec.spawned_pids()[0];

    tx.send(write("src/main.rs")).await?;
    assert!(wait_until(WAIT, || exec.spawn_count() == 2).await);
    let second = exec.spawned_pids()[1];

    let ops = exec.ops();
    let kill_first = position(&ops, &FakeOp::SignalGroup { pid: first, signal: KillSignal::Kill });
    let reap_first = position(&ops, &FakeOp::Wait { pid: first });
    let builds: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, FakeOp::Build(_)))
        .map(|(i, _)| i)
        .collect();
    let spawn_second = ops
        .iter()
        .position(|op| matches!(op, FakeOp::Spawn { pid, .. } if *pid == second))
        .ok_or("second spawn missing")?;

    assert_eq!(builds.len(), 2);
    assert!(kill_first < reap_first);
    assert!(reap_first < builds[1]);
    assert!(builds[1] < spawn_second);
    assert_eq!(exec.max_live(), 1);

    handle.stop().await?;
    timeout(WAIT, task).await???;
    assert!(exec.live().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_build_leaves_no_child_and_engine_keeps_going() -> TestResult {
    let (logs, _guard) = capture_logs();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    exec.script_builds(&[false, true]);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);
    let first = exec.spawned_pids()[0];

    tx.send(write("src/lib.rs")).await?;
    assert!(wait_until(WAIT, || exec.build_count() == 2).await);
    assert!(wait_until(WAIT, || logs.contains("build failed:")).await);
    assert!(exec.live().is_empty());
    assert_eq!(exec.spawn_count(), 1);
    assert_eq!(handle.current_pid().await, None);

    let failures = logs.lines_with("build failed:");
    assert_eq!(failures.len(), 1, "{failures:?}");
    assert!(failures[0].contains("ERROR"), "{}", failures[0]);
    assert!(failures[0].contains("'make' exited with status 1"), "{}", failures[0]);
    assert!(logs.contains(&format!("killing process {first}")));

    // The next change builds successfully again.
    tx.send(write("src/lib.rs")).await?;
    assert!(wait_until(WAIT, || exec.spawn_count() == 2).await);

    handle.stop().await?;
    timeout(WAIT, task).await???;

    let out = logs.contents();
    assert_eq!(out.matches("building...").count(), 3, "{out}");
    assert_eq!(out.matches("running...").count(), 2, "{out}");
    assert!(out.contains("shutting down"), "{out}");
    Ok(())
}

#[tokio::test]
async fn program_that_exits_on_its_own_is_reaped_not_killed() -> TestResult {
    let (logs, _guard) = capture_logs();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);
    let first = exec.spawned_pids()[0];

    exec.exit(first, 3);
    // Noticed by the loop without any query or event.
    assert!(wait_until(WAIT, || logs.contains("process exited on its own")).await);
    let exits = logs.lines_with("process exited on its own");
    assert_eq!(exits.len(), 1, "{exits:?}");
    assert!(exits[0].contains("exit status: 3"), "{}", exits[0]);
    assert!(exits[0].contains(&format!("pid={first}")), "{}", exits[0]);
    assert_eq!(handle.current_pid().await, None);

    tx.send(write("src/main.rs")).await?;
    assert!(wait_until(WAIT, || exec.spawn_count() == 2).await);

    let signalled_first = exec.ops().iter().any(|op| {
        matches!(op, FakeOp::SignalGroup { pid, .. } | FakeOp::SignalProcess { pid, .. } if *pid == first)
    });
    assert!(!signalled_first);
    assert!(!logs.contains(&format!("killing process {first}")));
    assert_eq!(exec.max_live(), 1);

    handle.stop().await?;
    with_timeout(task).await??;
    Ok(())
}

#[tokio::test]
async fn start_failure_is_logged_and_recovered() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    exec.fail_spawns(true);

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.ops().contains(&FakeOp::SpawnFailed("./app".into()))).await);
    assert_eq!(handle.current_pid().await, None);
    assert!(handle.is_running());

    exec.fail_spawns(false);
    assert!(handle.trigger_refresh());
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    handle.stop().await?;
    timeout(WAIT, task).await???;
    Ok(())
}

#[tokio::test]
async fn manual_refresh_goes_through_the_loop() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    assert!(handle.trigger_refresh());
    assert!(wait_until(WAIT, || exec.spawn_count() == 2).await);
    assert_eq!(exec.max_live(), 1);

    handle.stop().await?;
    timeout(WAIT, task).await???;

    // The loop is gone; further refreshes are refused.
    assert!(!handle.trigger_refresh());
    Ok(())
}

#[tokio::test]
async fn irrelevant_changes_do_not_rebuild() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    tx.send(write("README.md")).await?;
    tx.send(write("vendor/dep.rs")).await?;
    tx.send(EngineEvent::FileChanged(ChangeEvent::new(
        "src/gone.rs",
        ChangeKind::Remove,
    )))
    .await?;
    tx.send(EngineEvent::WatcherError("inotify overflow".into()))
        .await?;

    handle.stop().await?;
    timeout(WAIT, task).await???;
    assert_eq!(exec.build_count(), 1);
    Ok(())
}

#[tokio::test]
async fn burst_of_changes_coalesces_into_one_rebuild() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").delay("200ms").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    for i in 0..5 {
        tx.send(write(&format!("src/m{i}.rs"))).await?;
    }
    assert!(handle.trigger_refresh());

    assert!(wait_until(WAIT, || exec.spawn_count() == 2).await);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(exec.build_count(), 2);

    handle.stop().await?;
    timeout(WAIT, task).await???;
    Ok(())
}

#[tokio::test]
async fn shutdown_during_debounce_cancels_the_rebuild() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").delay("300ms").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    let tx = handle.event_sender();

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    tx.send(write("src/main.rs")).await?;
    tx.send(EngineEvent::ShutdownRequested).await?;
    timeout(WAIT, task).await???;

    assert_eq!(exec.build_count(), 1);
    assert!(exec.live().is_empty());
    assert!(!handle.is_running());
    Ok(())
}

#[tokio::test]
async fn stop_during_build_starts_nothing() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);
    exec.set_build_delay(Duration::from_millis(200));

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.build_count() == 1).await);

    handle.stop().await?;
    timeout(WAIT, task).await???;

    assert_eq!(exec.spawn_count(), 0);
    assert!(exec.live().is_empty());
    Ok(())
}

#[tokio::test]
async fn stop_before_run_skips_the_first_build() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);

    handle.stop().await?;
    handle.stop().await?;
    timeout(WAIT, runtime.run(None)).await??;

    assert_eq!(exec.build_count(), 0);
    assert!(!handle.is_running());
    Ok(())
}

#[tokio::test]
async fn dropping_every_sender_ends_the_loop() -> TestResult {
    init_tracing();
    let cfg = ConfigBuilder::new("make", "./app").build();
    let (runtime, handle, exec) = fake_engine(&cfg);

    let task = tokio::spawn(runtime.run(None));
    assert!(wait_until(WAIT, || exec.spawn_count() == 1).await);

    drop(handle);
    timeout(WAIT, task).await???;
    assert!(exec.live().is_empty());
    Ok(())
}
