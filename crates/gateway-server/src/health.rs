//! `/health` and `/meta` endpoints.

use std::time::Instant;

use serde::Serialize;

use gateway_core::protocol::{CAPABILITIES, PROTOCOL_COMPAT, PROTOCOL_VERSION, SERVER_VERSION, SERVICE_NAME};

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Service identifier.
    pub service: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Authenticated WebSocket connections.
    pub authenticated: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, authenticated: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        service: SERVICE_NAME.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        authenticated,
    }
}

/// Discovery document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    /// Service identifier.
    pub service: String,
    /// Protocol version spoken.
    pub protocol_version: u32,
    /// Protocol versions understood.
    pub protocol_compat: Vec<u32>,
    /// Server release.
    pub server_version: String,
    /// Feature tags.
    pub capabilities: Vec<String>,
    /// `enabled` or `disabled`, from the settings document.
    pub mode: String,
}

/// Build the discovery document.
pub fn meta(enabled: bool) -> MetaResponse {
    MetaResponse {
        service: SERVICE_NAME.into(),
        protocol_version: PROTOCOL_VERSION,
        protocol_compat: PROTOCOL_COMPAT.to_vec(),
        server_version: SERVER_VERSION.into(),
        capabilities: CAPABILITIES.iter().map(|c| (*c).to_owned()).collect(),
        mode: if enabled { "enabled" } else { "disabled" }.into(),
    }
}
