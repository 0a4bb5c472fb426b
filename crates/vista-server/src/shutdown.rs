//! Shutdown coordination between the listener and open live sessions.
//!
//! Cancelling the token stops the listener and tells every session to stop,
//! which sends the client its summary. [`ShutdownCoordinator::drain`] then
//! waits for the last [`SessionGuard`] to drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Sessions {
    active: AtomicUsize,
    idle: Notify,
}

/// Owns the server's cancellation token and the open-session count.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: Arc<Sessions>,
}

impl ShutdownCoordinator {
    /// Coordinator with no open sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting connections and tell open sessions to wrap up.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`Self::shutdown`] has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Open live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.active.load(Ordering::Acquire)
    }

    /// Count one live session until the guard drops.
    pub fn session_guard(&self) -> SessionGuard {
        let _ = self.sessions.active.fetch_add(1, Ordering::AcqRel);
        counter!("ws_connections_total").increment(1);
        gauge!("ws_connections_active").increment(1.0);
        SessionGuard {
            sessions: Arc::clone(&self.sessions),
        }
    }

    /// Wait up to `timeout` for every open session to finish.
    ///
    /// Returns `false` if sessions were still open at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let open = self.active_sessions();
        if open > 0 {
            info!(open, timeout_secs = timeout.as_secs(), "waiting for live sessions to finish");
        }
        let wait = async {
            loop {
                // Registered before the check so a concurrent last drop is not missed
                let idle = self.sessions.idle.notified();
                if self.active_sessions() == 0 {
                    return;
                }
                idle.await;
            }
        };
        let drained = tokio::time::timeout(timeout, wait).await.is_ok();
        if !drained {
            warn!(
                open = self.active_sessions(),
                "shutdown timed out after {timeout:?}, some sessions may still be open"
            );
        }
        drained
    }
}

/// Marks one open live session. Dropping it releases the count.
#[derive(Debug)]
pub struct SessionGuard {
    sessions: Arc<Sessions>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        gauge!("ws_connections_active").decrement(1.0);
        if self.sessions.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.sessions.idle.notify_waiters();
        }
    }
}
