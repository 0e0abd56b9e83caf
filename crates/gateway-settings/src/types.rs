//! Gateway process configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default WebSocket/HTTP port.
pub const DEFAULT_PORT: u16 = 17888;

/// Default inbound frame cap (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Default per-connection in-flight RPC cap.
pub const DEFAULT_MAX_CONCURRENT_RPC: usize = 16;

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Root configuration document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Listener, auth, and limits.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// How role requirements on methods are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleEnforcement {
    /// Roles are recorded and reported but never block a call.
    #[default]
    Advisory,
    /// Calls whose session role is below the method's requirement fail.
    Enforced,
}

/// Listener, authentication, and resource limits.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks an ephemeral port.
    pub port: u16,
    /// Shared secret. Empty means every auth attempt fails.
    pub token: String,
    /// Largest accepted inbound frame, in bytes.
    pub max_payload_bytes: usize,
    /// In-flight RPC cap per connection.
    pub max_concurrent_rpc_per_client: usize,
    /// Liveness ping interval.
    pub heartbeat_interval_ms: u64,
    /// Data directory. Empty means `~/.remote-gateway`.
    pub data_dir: String,
    /// Role enforcement mode.
    pub role_enforcement: RoleEnforcement,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            token: String::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_concurrent_rpc_per_client: DEFAULT_MAX_CONCURRENT_RPC,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            data_dir: String::new(),
            role_enforcement: RoleEnforcement::Advisory,
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field(
                "max_concurrent_rpc_per_client",
                &self.max_concurrent_rpc_per_client,
            )
            .field("heartbeat_interval_ms", &self.heartbeat_interval_ms)
            .field("data_dir", &self.data_dir)
            .field("role_enforcement", &self.role_enforcement)
            .finish()
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`..`error`). `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
