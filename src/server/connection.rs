// Connection handling module
// Accepts a single TCP connection and serves it with the request handler

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::AppState;
use crate::handler;

/// Decrements the active connection counter when the connection task ends,
/// including when it is cancelled
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept and process a connection, checking the connection limit
///
/// Returns `false` when the connection was rejected.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
) -> bool {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard(Arc::clone(conn_counter));

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            tracing::warn!(%peer_addr, active = prev_count, max_conn, "connection limit reached, rejecting");
            drop(stream);
            return false;
        }
    }

    tracing::trace!(%peer_addr, "connection accepted");
    tokio::spawn(handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        shutdown,
        guard,
    ));
    true
}

/// Serve one connection until the client closes it or the timeout expires
///
/// A shutdown signal lets the in-flight request finish, then closes the
/// connection instead of waiting for the next keep-alive request.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
    _guard: ConnectionGuard,
) {
    let io = TokioIo::new(stream);

    let performance = &state.config.performance;
    let timeout_duration = Duration::from_secs(std::cmp::max(
        performance.read_timeout,
        performance.write_timeout,
    ));

    let mut builder = http1::Builder::new();
    builder.keep_alive(performance.keep_alive_timeout > 0);

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
    );
    tokio::pin!(conn);

    let served = async {
        tokio::select! {
            res = conn.as_mut() => res,
            _ = shutdown.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    };

    match tokio::time::timeout(timeout_duration, served).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(%peer_addr, error = %err, "connection error"),
        Err(_) => tracing::warn!(
            %peer_addr,
            timeout_secs = timeout_duration.as_secs(),
            "connection timed out"
        ),
    }
}
