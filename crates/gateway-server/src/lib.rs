//! # gateway-server
//!
//! Axum HTTP + `WebSocket` listener for the remote gateway.
//!
//! - `WebSocket` protocol: hello, token auth, multiplexed RPC, server events
//! - Per-connection state machine with a bounded in-flight RPC budget
//! - Global heartbeat that terminates unresponsive connections
//! - Event fan-out to authenticated connections only
//! - HTTP endpoints: health, meta, bundle manifest, static bundles, metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod bundles;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{GatewayServer, ServerError};
