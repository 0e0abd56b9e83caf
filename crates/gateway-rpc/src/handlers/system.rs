//! System handlers: ping, methods.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::{RpcContext, SessionContext};
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Liveness check.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        _ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        Ok(json!({
            "pong": true,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        }))
    }
}

/// List registered methods with their expected roles.
pub struct MethodsHandler;

#[async_trait]
impl MethodHandler for MethodsHandler {
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let methods = serde_json::to_value(ctx.catalog()).map_err(|e| RpcError::Internal {
            message: e.to_string(),
        })?;
        Ok(json!({ "methods": methods }))
    }
}
