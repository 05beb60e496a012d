// tests/property_single_child.rs

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use hotrun::engine::EngineEvent;
use hotrun::exec::{ProcessSupervisor, StopPolicy};
use hotrun::watch::{ChangeEvent, ChangeKind};
use hotrun_test_utils::builders::ConfigBuilder;
use hotrun_test_utils::fake_executor::{fake_engine, FakeExecutor, ProcessBehaviour};

#[derive(Debug, Clone)]
enum Trigger {
    Change(&'static str, ChangeKind),
    Manual,
    WatcherError,
}

fn trigger_strategy() -> impl Strategy<Value = Trigger> {
    let paths = prop::sample::select(vec!["src/main.rs", "src/vendor/x.rs", "README.md", "lib.rs"]);
    let kinds = prop::sample::select(vec![
        ChangeKind::Write,
        ChangeKind::Create,
        ChangeKind::Remove,
        ChangeKind::Rename,
    ]);
    prop_oneof![
        4 => (paths, kinds).prop_map(|(p, k)| Trigger::Change(p, k)),
        2 => Just(Trigger::Manual),
        1 => Just(Trigger::WatcherError),
    ]
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever arrives, and whichever builds fail, at most one child is
    /// ever alive and nothing survives a stop.
    #[test]
    fn engine_never_runs_two_children(
        triggers in prop::collection::vec(trigger_strategy(), 0..20),
        build_failures in prop::collection::vec(any::<bool>(), 0..20),
        send_interrupt in any::<bool>(),
    ) {
        let (max_live, live_after) = rt().block_on(async move {
            let cfg = ConfigBuilder::new("make", "./app")
                .send_interrupt(send_interrupt)
                .build();
            let (runtime, handle, exec) = fake_engine(&cfg);
            exec.script_builds(&build_failures);
            let tx = handle.event_sender();

            let task = tokio::spawn(runtime.run(None));
            for trigger in triggers {
                let event = match trigger {
                    Trigger::Change(path, kind) => {
                        EngineEvent::FileChanged(ChangeEvent::new(path, kind))
                    }
                    Trigger::Manual => EngineEvent::ManualRefresh,
                    Trigger::WatcherError => EngineEvent::WatcherError("overflow".into()),
                };
                tx.send(event).await.expect("engine alive");
            }

            handle.stop().await.expect("stop");
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("loop exits")
                .expect("no panic")
                .expect("clean exit");

            (exec.max_live(), exec.live())
        });

        prop_assert!(max_live <= 1, "max live children = {}", max_live);
        prop_assert!(live_after.is_empty(), "survivors: {:?}", live_after);
    }

    /// Concurrent start/stop calls on one supervisor never overlap children.
    #[test]
    fn supervisor_serialises_concurrent_calls(
        calls in prop::collection::vec(any::<bool>(), 1..16),
        ignores_interrupt in any::<bool>(),
    ) {
        let (max_live, live_after) = rt().block_on(async move {
            let exec = FakeExecutor::new();
            exec.set_behaviour(ProcessBehaviour {
                ignores_interrupt,
                ..Default::default()
            });
            let sup = Arc::new(ProcessSupervisor::new(
                Arc::new(exec.clone()),
                StopPolicy { send_interrupt: true, kill_delay: Duration::ZERO },
            ));

            let mut tasks = Vec::new();
            for start in calls {
                let sup = Arc::clone(&sup);
                tasks.push(tokio::spawn(async move {
                    if start {
                        sup.start("./app").await.map(|_| ())
                    } else {
                        sup.stop_current().await.map(|_| ())
                    }
                }));
            }
            for t in tasks {
                t.await.expect("no panic").expect("call succeeds");
            }
            sup.stop_current().await.expect("final stop");

            (exec.max_live(), exec.live())
        });

        prop_assert!(max_live <= 1, "max live children = {}", max_live);
        prop_assert!(live_after.is_empty(), "survivors: {:?}", live_after);
    }
}
