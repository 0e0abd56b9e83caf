//! Shutdown coordination via `CancellationToken`.
//!
//! One token is shared by the listener (axum graceful shutdown, which also
//! terminates every open session) and the heartbeat task.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::drain`] waits by default.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Stops the listener and the heartbeat task.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    reason: Mutex<Option<&'static str>>,
}

impl ShutdownCoordinator {
    /// Coordinator that has not fired yet.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Mutex::new(None),
        }
    }

    /// Token observed by long-running tasks.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire with a generic reason.
    pub fn shutdown(&self) {
        self.trigger("requested");
    }

    /// Fire, recording why. Only the first reason is kept.
    pub fn trigger(&self, reason: &'static str) {
        {
            let mut slot = self.reason.lock();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason);
        }
        info!(reason, "gateway shutdown initiated");
        self.token.cancel();
    }

    /// Whether shutdown has fired.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why shutdown fired, if it has.
    pub fn reason(&self) -> Option<&'static str> {
        *self.reason.lock()
    }

    /// Wait up to `timeout` for `handles` to finish.
    ///
    /// Returns `false` when the wait timed out; stragglers are aborted.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_ok()
        {
            return true;
        }
        warn!(?timeout, "gateway tasks did not stop in time, aborting");
        for handle in aborts {
            handle.abort();
        }
        false
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
