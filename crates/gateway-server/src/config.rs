//! Runtime configuration for the listener.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use gateway_settings::ServerSettings;
use gateway_settings::types::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_CONCURRENT_RPC, DEFAULT_MAX_PAYLOAD_BYTES,
};

/// Outbound queue depth per connection.
pub const OUTBOUND_QUEUE_SIZE: usize = 1024;

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port (0 = auto-assign).
    pub port: u16,
    /// Shared secret. Empty rejects every auth attempt.
    pub token: SecretString,
    /// Largest accepted inbound frame, in bytes.
    pub max_payload_bytes: usize,
    /// In-flight RPC cap per connection.
    pub max_concurrent_rpc: usize,
    /// Heartbeat tick.
    pub heartbeat_interval: Duration,
    /// Outbound queue depth per connection.
    pub outbound_queue_size: usize,
}

impl ServerConfig {
    /// Build from the loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            token: SecretString::from(settings.token.clone()),
            max_payload_bytes: settings.max_payload_bytes,
            max_concurrent_rpc: settings.max_concurrent_rpc_per_client.max(1),
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms.max(1)),
            outbound_queue_size: OUTBOUND_QUEUE_SIZE,
        }
    }

    /// Same config with a different token.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = SecretString::from(token);
        self
    }

    /// Whether `presented` matches the configured token.
    ///
    /// An empty configured token never matches.
    pub fn token_matches(&self, presented: Option<&str>) -> bool {
        let expected = self.token.expose_secret();
        match presented {
            Some(p) => !expected.is_empty() && p == expected,
            None => false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            token: SecretString::from(""),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_concurrent_rpc: DEFAULT_MAX_CONCURRENT_RPC,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            outbound_queue_size: OUTBOUND_QUEUE_SIZE,
        }
    }
}
