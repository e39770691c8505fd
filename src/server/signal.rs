// Signal handling module
//
// Resolves when the process is asked to stop:
// - SIGINT (Ctrl+C) everywhere
// - SIGTERM on Unix

use crate::logger;

/// Wait for a shutdown request; returns the name of the signal received
#[cfg(unix)]
pub async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            logger::log_warning(&format!("Failed to register SIGTERM handler: {e}"));
            ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        () = ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

/// Wait for a shutdown request (only Ctrl+C outside Unix)
#[cfg(not(unix))]
pub async fn shutdown_signal() -> &'static str {
    ctrl_c().await;
    "Ctrl+C"
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
        // Without a signal source the server runs until killed
        std::future::pending::<()>().await;
    }
}
