//! Global ping/pong liveness sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::broadcast::BroadcastManager;

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatSweep {
    /// Connections that answered and were pinged again.
    pub pinged: usize,
    /// Connection ids terminated for missing a ping.
    pub terminated: Vec<String>,
}

/// Periodically pings every registered connection.
///
/// A connection that has not answered since the previous tick is
/// terminated and removed from the registry, so detection takes at most
/// two intervals.
pub struct HeartbeatMonitor {
    broadcast: Arc<BroadcastManager>,
    interval: Duration,
}

impl HeartbeatMonitor {
    /// Monitor the connections in `broadcast` every `interval`.
    pub fn new(broadcast: Arc<BroadcastManager>, interval: Duration) -> Self {
        Self {
            broadcast,
            interval,
        }
    }

    /// Run one sweep.
    pub async fn tick(&self) -> HeartbeatSweep {
        let mut sweep = HeartbeatSweep::default();
        for conn in self.broadcast.snapshot().await {
            if conn.check_alive() {
                let _ = conn.send_ping();
                sweep.pinged += 1;
                continue;
            }
            info!(conn_id = %conn.id, silent_for = ?conn.last_pong_elapsed(), "terminating unresponsive connection");
            conn.terminate();
            let _ = self.broadcast.remove(&conn.id).await;
            metrics::counter!(crate::metrics::HEARTBEAT_TERMINATIONS_TOTAL).increment(1);
            sweep.terminated.push(conn.id.clone());
        }
        sweep
    }

    /// Sweep on every interval until `cancel` fires.
    #[instrument(skip_all, name = "heartbeat")]
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sweep = self.tick().await;
                    if !sweep.terminated.is_empty() {
                        debug!(terminated = sweep.terminated.len(), pinged = sweep.pinged, "heartbeat sweep");
                    }
                }
                () = cancel.cancelled() => {
                    debug!("heartbeat stopped");
                    return;
                }
            }
        }
    }
}
