// Server loop module
// Accepts connections until shutdown, then drains open connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config::AppState;

/// How often the drain phase checks the connection counter
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop until `shutdown` is notified
///
/// After the notification the listener is closed, open connections are told
/// to finish their current request, and the loop waits up to
/// `performance.shutdown_grace_secs` for them. Returns the number of
/// connections still open when the grace period ran out.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) -> usize {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (stop_tx, stop_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            stop_rx.clone(),
                        );
                    }
                    Err(e) => {
                        // Usually EMFILE; back off instead of spinning
                        tracing::error!(error = %e, "failed to accept connection");
                        tokio::time::sleep(DRAIN_POLL).await;
                    }
                }
            }

            () = shutdown.notified() => {
                tracing::info!("shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    // Receivers only observe the change; nobody listening is fine
    let _ = stop_tx.send(true);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace_secs);
    let remaining = drain(&active_connections, grace).await;
    if remaining == 0 {
        tracing::info!("all connections closed");
    } else {
        tracing::warn!(remaining, "grace period expired with open connections");
    }
    remaining
}

/// Wait until the counter reaches zero or `grace` elapses
async fn drain(active: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let open = active.load(Ordering::SeqCst);
        if open == 0 || tokio::time::Instant::now() >= deadline {
            return open;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let active = AtomicUsize::new(0);
        assert_eq!(drain(&active, Duration::from_secs(5)).await, 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let active = AtomicUsize::new(2);
        let started = tokio::time::Instant::now();
        assert_eq!(drain(&active, Duration::from_millis(120)).await, 2);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }
}
