//! Metric names recorded by the gateway.
//!
//! Every `counter!`/`gauge!`/`histogram!` call site uses one of these.

/// WebSocket connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket disconnections (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Failed auth attempts (counter).
pub const WS_AUTH_FAILURES_TOTAL: &str = "ws_auth_failures_total";
/// Connections terminated by the heartbeat (counter).
pub const HEARTBEAT_TERMINATIONS_TOTAL: &str = "heartbeat_terminations_total";
/// RPCs refused before dispatch (counter, labels: reason).
pub const RPC_REJECTED_TOTAL: &str = "rpc_rejected_total";
/// Outbound events dropped on a full queue (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// WebSocket connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// RPCs dispatched (counter, labels: method).
pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
/// RPCs that failed (counter, labels: method, error_type).
pub const RPC_ERRORS_TOTAL: &str = "rpc_errors_total";
/// Handler run time (histogram, labels: method).
pub const RPC_REQUEST_DURATION_SECONDS: &str = "rpc_request_duration_seconds";

/// Every name above.
pub const ALL: &[&str] = &[
    WS_CONNECTIONS_TOTAL,
    WS_CONNECTIONS_ACTIVE,
    WS_DISCONNECTIONS_TOTAL,
    WS_AUTH_FAILURES_TOTAL,
    HEARTBEAT_TERMINATIONS_TOTAL,
    RPC_REJECTED_TOTAL,
    WS_BROADCAST_DROPS_TOTAL,
    WS_CONNECTION_DURATION_SECONDS,
    RPC_REQUESTS_TOTAL,
    RPC_ERRORS_TOTAL,
    RPC_REQUEST_DURATION_SECONDS,
];
