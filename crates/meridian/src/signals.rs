//! Signal handling for graceful server shutdown.
//!
//! Cross-platform signal handling that lets the server stop scheduling
//! simulation ticks cleanly when it receives a termination signal.

use tokio::signal;
use tracing::info;

/// Waits for a shutdown signal.
///
/// Listens for termination signals (SIGINT and SIGTERM on Unix; Ctrl+C on
/// Windows) and returns when one is received.
pub async fn wait_for_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    wait_for_shutdown_silent().await?;
    info!("Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

/// Signal wait without the announcement log line, for second-signal handling.
pub async fn wait_for_shutdown_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
