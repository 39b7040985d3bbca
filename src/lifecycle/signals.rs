//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into a graceful shutdown
//! - Force exit on a second signal while draining

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::lifecycle::Shutdown;

/// Exit code used when a second signal interrupts draining.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Wait for a shutdown signal (SIGINT or SIGTERM on Unix, ctrl-c elsewhere).
#[cfg(unix)]
pub async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!(signal = "SIGINT", "Signal received"),
        _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!(signal = "ctrl-c", "Signal received");
    Ok(())
}

/// Trigger `shutdown` when the process is asked to stop.
///
/// A second signal after shutdown has started exits the process immediately.
pub fn trigger_on_signal(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            warn!(error = %e, "Failed to install signal handlers");
            return;
        }
        info!("Shutdown signal received, stopping gateway");
        shutdown.trigger();

        if shutdown_signal().await.is_ok() {
            warn!("Second signal received, exiting without draining");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}
