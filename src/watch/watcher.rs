// src/watch/watcher.rs

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::EngineEvent;
use crate::errors::{HotrunError, Result};
use crate::watch::classify::ChangeEvent;
use crate::watch::watch_set::WatchSet;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle closes the watcher.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    registered: usize,
}

impl WatcherHandle {
    /// Number of directories registered with the OS watcher.
    pub fn registered(&self) -> usize {
        self.registered
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("registered", &self.registered)
            .finish()
    }
}

/// Register every directory of `watch_set` (non-recursively) and forward
/// raw changes to the engine as `EngineEvent::FileChanged`.
///
/// Classification happens in the control loop, not here. Watcher errors are
/// forwarded as `EngineEvent::WatcherError` so the loop can log them and carry
/// on. Failing to create the watcher or to register a directory is a setup
/// failure.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_watcher(
    watch_set: &WatchSet,
    engine_tx: mpsc::Sender<EngineEvent>,
) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                // Runs on notify's thread; the receiving task is gone.
                warn!(error = %err, "failed to forward notify event");
            }
        },
        Config::default(),
    )?;

    for dir in watch_set.iter() {
        watcher.watch(dir, RecursiveMode::NonRecursive).map_err(|e| {
            HotrunError::SetupError(format!("watching {:?}: {e}", dir))
        })?;
        debug!(dir = ?dir, "watching directory");
    }

    info!(
        root = ?watch_set.root(),
        dirs = watch_set.len(),
        "file watcher started"
    );

    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            let outgoing = match res {
                Ok(event) => {
                    debug!(?event, "received notify event");
                    ChangeEvent::from_notify(&event)
                        .into_iter()
                        .map(EngineEvent::FileChanged)
                        .collect()
                }
                Err(err) => vec![EngineEvent::WatcherError(err.to_string())],
            };

            for event in outgoing {
                if engine_tx.send(event).await.is_err() {
                    // The control loop is gone; nothing left to notify.
                    debug!("engine channel closed; stopping watcher forwarder");
                    return;
                }
            }
        }
        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        registered: watch_set.len(),
    })
}
