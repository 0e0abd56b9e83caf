//! Per-connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use gateway_rpc::{ServerMessage, SessionContext};

/// Frame queued for the socket writer.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// JSON text frame.
    Text(Arc<String>),
    /// Transport-level ping.
    Ping,
}

/// Session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no valid token yet.
    Unauthenticated,
    /// Token accepted.
    Authenticated {
        /// Assigned client id.
        client_id: String,
        /// Advisory role label, if presented.
        role: Option<String>,
    },
    /// Terminal. Nothing more is sent or processed.
    Closed,
}

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    state: Mutex<SessionState>,
    /// Send channel to the socket writer task.
    tx: mpsc::Sender<Outbound>,
    rpc_slots: Arc<Semaphore>,
    rpc_limit: usize,
    terminate: CancellationToken,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has answered since the last heartbeat tick.
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    /// Count of frames dropped due to a full queue.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new unauthenticated connection.
    pub fn new(id: String, tx: mpsc::Sender<Outbound>, rpc_limit: usize) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: Mutex::new(SessionState::Unauthenticated),
            tx,
            rpc_slots: Arc::new(Semaphore::new(rpc_limit)),
            rpc_limit,
            terminate: CancellationToken::new(),
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    // ── State machine ───────────────────────────────────────────────

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Whether the session has been authenticated and is not closed.
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Authenticated { .. })
    }

    /// Whether the session has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Closed)
    }

    /// Move to (or stay in) `Authenticated` with a new identity.
    ///
    /// Returns `false` if the session is already closed.
    pub fn authenticate(&self, client_id: String, role: Option<String>) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Closed) {
            return false;
        }
        *state = SessionState::Authenticated { client_id, role };
        true
    }

    /// Enter the terminal state. Idempotent.
    pub fn close(&self) {
        *self.state.lock() = SessionState::Closed;
    }

    /// Close and signal the session loop to tear the socket down.
    pub fn terminate(&self) {
        self.close();
        self.terminate.cancel();
    }

    /// Token cancelled by [`terminate`](Self::terminate).
    pub fn termination_token(&self) -> CancellationToken {
        self.terminate.clone()
    }

    /// Handler-facing identity, present only when authenticated.
    pub fn session_context(&self) -> Option<SessionContext> {
        match &*self.state.lock() {
            SessionState::Authenticated { client_id, role } => Some(SessionContext {
                connection_id: self.id.clone(),
                client_id: client_id.clone(),
                role: role.clone(),
            }),
            _ => None,
        }
    }

    /// Client id, when authenticated.
    pub fn client_id(&self) -> Option<String> {
        match &*self.state.lock() {
            SessionState::Authenticated { client_id, .. } => Some(client_id.clone()),
            _ => None,
        }
    }

    // ── RPC budget ──────────────────────────────────────────────────

    /// Claim one in-flight slot. `None` when the limit is reached.
    ///
    /// The slot is released when the permit drops.
    pub fn try_acquire_rpc_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.rpc_slots).try_acquire_owned().ok()
    }

    /// Calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.rpc_limit - self.rpc_slots.available_permits()
    }

    /// Configured in-flight limit.
    pub fn rpc_limit(&self) -> usize {
        self.rpc_limit
    }

    // ── Outbound ────────────────────────────────────────────────────

    /// Queue an event frame without waiting.
    ///
    /// Returns `false` if the session is closed or the queue is full or
    /// gone. Full-queue drops are counted.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.enqueue(Outbound::Text(message))
    }

    /// Serialize and queue a reply, waiting for queue capacity.
    ///
    /// Replies are never dropped. Returns `false` when the session is
    /// closed or terminated, or the writer has gone away.
    pub async fn send_reply(&self, message: &ServerMessage) -> bool {
        if self.is_closed() {
            return false;
        }
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "failed to serialize reply");
                return false;
            }
        };
        tokio::select! {
            res = self.tx.send(Outbound::Text(Arc::new(json))) => res.is_ok(),
            () = self.terminate.cancelled() => false,
        }
    }

    /// Queue a transport ping.
    pub fn send_ping(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.enqueue(Outbound::Ping)
    }

    fn enqueue(&self, frame: Outbound) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(crate::metrics::WS_BROADCAST_DROPS_TOTAL).increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    // ── Liveness ────────────────────────────────────────────────────

    /// Mark the connection as alive (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Read and clear the alive flag.
    ///
    /// Returns `true` if the client answered since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Current alive flag, without clearing it.
    pub fn is_alive(&self) -> bool {
        self.is_alive.load(Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
