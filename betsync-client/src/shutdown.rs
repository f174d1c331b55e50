//! Shutdown coordination.
//!
//! A [`ShutdownHandle`] is shared between the session and the signal
//! listener. The first `close_once` call clears the liveness flag and fires
//! the socket token, then the file token; every later call is a no-op. The
//! session's [`Closable`](crate::Closable) resources watch those tokens, so
//! any read or write in flight fails promptly instead of hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ShutdownState {
    alive: AtomicBool,
    closed: AtomicBool,
    socket: CancellationToken,
    file: CancellationToken,
}

/// Shared liveness and close state for one client run.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    state: Arc<ShutdownState>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(ShutdownState {
                alive: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                socket: CancellationToken::new(),
                file: CancellationToken::new(),
            }),
        }
    }

    /// Returns whether the run is still alive (no shutdown requested).
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    /// Returns whether shutdown has been triggered.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Token that closes the session socket when cancelled.
    pub fn socket_token(&self) -> CancellationToken {
        self.state.socket.clone()
    }

    /// Token that closes the bet file when cancelled.
    pub fn file_token(&self) -> CancellationToken {
        self.state.file.clone()
    }

    /// Triggers shutdown. Returns `true` only for the first caller.
    pub fn close_once(&self) -> bool {
        if self.state.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.state.alive.store(false, Ordering::SeqCst);
        self.state.socket.cancel();
        self.state.file.cancel();
        true
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a task that triggers `handle` on SIGINT (Ctrl-C) or, on unix,
/// SIGTERM.
pub fn spawn_signal_listener(handle: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Received shutdown signal, closing connection");
        if handle.close_once() {
            tracing::debug!("shutdown triggered");
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}
