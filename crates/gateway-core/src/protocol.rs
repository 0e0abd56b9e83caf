//! Protocol identity constants advertised in `hello` and `/meta`.

/// Protocol version spoken by this server.
pub const PROTOCOL_VERSION: u32 = 1;

/// Protocol versions a client may speak and still be understood.
pub const PROTOCOL_COMPAT: &[u32] = &[1];

/// Service name reported by `/health` and `/meta`.
pub const SERVICE_NAME: &str = "remote-gateway";

/// Server build version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Feature flags advertised in `/meta`.
pub const CAPABILITIES: &[&str] = &[
    "rpc",
    "events",
    "settings",
    "files",
    "remote-bundles",
    "audit",
];
