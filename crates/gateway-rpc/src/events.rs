//! Event publication seam.
//!
//! Handlers publish through [`EventSink`]; the server's connection registry
//! implements it. Delivery is best-effort: a recipient whose queue is full
//! or whose connection is closing simply misses the event.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// Destination for server-pushed events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver to every authenticated connection. Returns the recipient count.
    async fn publish(&self, event: &str, payload: Value) -> usize;

    /// Deliver to one connection if it is open and authenticated.
    async fn publish_to(&self, connection_id: &str, event: &str, payload: Value) -> bool;
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: &str, _payload: Value) -> usize {
        0
    }

    async fn publish_to(&self, _connection_id: &str, _event: &str, _payload: Value) -> bool {
        false
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingEventSink {
    /// Everything published so far, oldest first.
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: &str, payload: Value) -> usize {
        self.events.lock().push((event.to_owned(), payload));
        1
    }

    async fn publish_to(&self, _connection_id: &str, event: &str, payload: Value) -> bool {
        self.events.lock().push((event.to_owned(), payload));
        true
    }
}
