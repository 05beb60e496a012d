// src/signals.rs

//! OS signal handling for the CLI.
//!
//! Ctrl-C and SIGTERM stop the engine; SIGHUP asks for a manual rebuild.

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::engine::EngineHandle;

/// Spawn the signal listener task. It ends after the first stop signal.
pub fn spawn_signal_listener(handle: EngineHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_stop(&handle).await {
            error!("failed to listen for signals: {e}");
            return;
        }

        info!("stop signal received");
        if let Err(err) = handle.stop().await {
            error!(error = %err, "failed to stop engine");
        }
    })
}

#[cfg(unix)]
async fn wait_for_stop(handle: &EngineHandle) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => return res,
            _ = term.recv() => return Ok(()),
            _ = hangup.recv() => {
                info!("SIGHUP received; triggering rebuild");
                handle.trigger_refresh();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_stop(_handle: &EngineHandle) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
