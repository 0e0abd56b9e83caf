//! WebSocket protocol: connection state, frame dispatch, heartbeat, and
//! event fan-out.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod session;
