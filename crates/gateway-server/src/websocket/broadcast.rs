//! Connection registry and event fan-out.
//!
//! This is the single authoritative set of live connections. Session
//! teardown, heartbeat termination, and publication all go through it, and
//! membership changes happen under the write lock so a removed connection
//! never receives a later publish.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use gateway_rpc::{EventSink, ServerMessage};

use super::connection::ClientConnection;

/// Manages the live connection set and event broadcasting.
pub struct BroadcastManager {
    /// Connected clients indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID. Idempotent.
    pub async fn remove(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        let mut conns = self.connections.write().await;
        conns.remove(connection_id)
    }

    /// Every registered connection.
    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of authenticated connections.
    pub async fn authenticated_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.is_authenticated())
            .count()
    }

    /// Send an event to every authenticated connection.
    ///
    /// The envelope is serialized once. Returns the number of connections
    /// that accepted it.
    pub async fn broadcast_event(&self, event: &str, payload: Value) -> usize {
        let Some(json) = serialize_event(event, payload) else {
            return 0;
        };
        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values().filter(|c| c.is_authenticated()) {
            if conn.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, event, "failed to send event to client");
            }
        }
        debug!(event, recipients = delivered, "broadcast event");
        delivered
    }

    /// Send an event to one authenticated connection.
    pub async fn send_event_to(&self, connection_id: &str, event: &str, payload: Value) -> bool {
        let Some(json) = serialize_event(event, payload) else {
            return false;
        };
        let conns = self.connections.read().await;
        match conns.get(connection_id) {
            Some(conn) if conn.is_authenticated() => conn.send(json),
            _ => false,
        }
    }
}

fn serialize_event(event: &str, payload: Value) -> Option<Arc<String>> {
    match ServerMessage::event(event, payload).to_json() {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(event, error = %e, "failed to serialize event");
            None
        }
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for BroadcastManager {
    async fn publish(&self, event: &str, payload: Value) -> usize {
        self.broadcast_event(event, payload).await
    }

    async fn publish_to(&self, connection_id: &str, event: &str, payload: Value) -> bool {
        self.send_event_to(connection_id, event, payload).await
    }
}
