//! # gateway-core
//!
//! Building blocks shared by every layer of the remote gateway:
//!
//! - [`sandbox`]: lexical path normalization and allowed-root checks
//! - [`audit`]: append-only JSON-lines audit trail
//! - [`protocol`]: wire protocol version and service identity constants
//! - [`ids`]: connection and client identifier generation
//! - [`metrics`]: metric names shared by the RPC and server layers

#![deny(unsafe_code)]

pub mod audit;
pub mod ids;
pub mod metrics;
pub mod protocol;
pub mod sandbox;
