//! # gateway-rpc
//!
//! Everything between a parsed frame and a handler result:
//!
//! - [`types`]: client and server envelopes
//! - [`errors`]: error codes, [`RpcError`], and protocol-level errors
//! - [`roles`]: advisory roles and the [`RoleGate`] seam
//! - [`registry`]: method name to handler mapping and dispatch
//! - [`context`]: per-session and shared handler context
//! - [`events`]: the [`EventSink`] handlers publish through
//! - [`handlers`]: built-in operations

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod registry;
pub mod roles;
pub mod types;

pub use context::{GatewayPaths, RpcContext, SessionContext};
pub use errors::{ProtocolError, RpcError};
pub use events::EventSink;
pub use registry::{MethodHandler, MethodInfo, MethodRegistry};
pub use roles::{AdvisoryRoleGate, Role, RoleGate, StrictRoleGate};
pub use types::{AuthRequest, ClientMessage, RpcRequest, RpcResponse, ServerMessage};
