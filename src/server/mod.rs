// Server module entry point
// Listener binding, connection handling and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::AppState;
use crate::logger;

// Re-export commonly used items
pub use listener::{bind_with_retry, create_listener};
pub use signal::shutdown_signal;

/// Accept connections until a shutdown signal arrives
///
/// In-flight connections keep running on their own tasks.
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> io::Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        logger::log_debug(&format!("Accepted connection from {peer_addr}"));
                        connection::handle_connection(stream, peer_addr, Arc::clone(&state));
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            signal = &mut shutdown => {
                logger::log_shutdown(signal);
                return Ok(());
            }
        }
    }
}
