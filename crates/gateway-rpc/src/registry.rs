//! Method registry and async dispatch.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, instrument, warn};

use gateway_core::metrics::{RPC_ERRORS_TOTAL, RPC_REQUESTS_TOTAL, RPC_REQUEST_DURATION_SECONDS};

use crate::context::{RpcContext, SessionContext};
use crate::errors::{self, RpcError};
use crate::roles::{AdvisoryRoleGate, Role, RoleGate};
use crate::types::{RpcRequest, RpcResponse};

/// Trait implemented by every RPC method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler. `params` is always an object or a client-supplied
    /// non-null value; a missing `params` arrives as `{}`.
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError>;
}

/// Public description of a registered method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    /// Method name.
    pub method: String,
    /// Role the method expects.
    pub role: Role,
}

struct Registration {
    role: Role,
    handler: Arc<dyn MethodHandler>,
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Registration>,
    gate: Arc<dyn RoleGate>,
}

impl MethodRegistry {
    /// Empty registry with the advisory gate.
    pub fn new() -> Self {
        Self::with_gate(Arc::new(AdvisoryRoleGate))
    }

    /// Empty registry with a specific role gate.
    pub fn with_gate(gate: Arc<dyn RoleGate>) -> Self {
        Self {
            handlers: HashMap::new(),
            gate,
        }
    }

    /// Register a handler. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, method: &str, role: Role, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(
            method.to_owned(),
            Registration {
                role,
                handler: Arc::new(handler),
            },
        );
    }

    /// Dispatch a request to its handler.
    ///
    /// Always yields exactly one response. Handler errors and panics become
    /// failed responses; handlers are never timed out or cancelled.
    #[instrument(skip_all, fields(method = %request.method, client_id = %session.client_id))]
    pub async fn dispatch(
        &self,
        request: RpcRequest,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> RpcResponse {
        let (id, method, params) = request.into_parts();
        counter!(RPC_REQUESTS_TOTAL, "method" => method.clone()).increment(1);

        let Some(registration) = self.handlers.get(&method) else {
            counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            return RpcResponse::error(
                id,
                errors::METHOD_NOT_FOUND,
                format!("Unknown method: {method}"),
            );
        };

        if let Err(err) = self
            .gate
            .check(session.role.as_deref(), registration.role, &method)
        {
            counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => err.code().to_owned()).increment(1);
            warn!(role = ?session.role, required = %registration.role, "role gate refused call");
            return RpcResponse::error(id, err.code(), err.to_string());
        }

        let start = Instant::now();
        let outcome = AssertUnwindSafe(registration.handler.handle(params, session, ctx))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(result)) => RpcResponse::success(id, result),
            Ok(Err(err)) => {
                counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => err.code().to_owned()).increment(1);
                if let RpcError::PathNotAllowed { path } = &err {
                    ctx.audit
                        .record(
                            "sandbox.denied",
                            session.actor(),
                            json!({ "method": method, "path": path }),
                        )
                        .await;
                }
                RpcResponse::error(id, err.code(), err.to_string())
            }
            Err(panic) => {
                counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => "panic").increment(1);
                let detail = panic_message(panic.as_ref());
                error!(panic = %detail, "RPC handler panicked");
                RpcResponse::error(
                    id,
                    errors::INTERNAL_ERROR,
                    format!("Handler for '{method}' panicked: {detail}"),
                )
            }
        };

        let duration = start.elapsed();
        histogram!(RPC_REQUEST_DURATION_SECONDS, "method" => method.clone())
            .record(duration.as_secs_f64());

        if duration.as_secs() >= 5 {
            warn!(duration_secs = duration.as_secs_f64(), "slow RPC request");
        }

        response
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Method names with their expected roles (sorted by name).
    pub fn catalog(&self) -> Vec<MethodInfo> {
        let mut infos: Vec<MethodInfo> = self
            .handlers
            .iter()
            .map(|(method, reg)| MethodInfo {
                method: method.clone(),
                role: reg.role,
            })
            .collect();
        infos.sort_by(|a, b| a.method.cmp(&b.method));
        infos
    }

    /// Check whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Role a method expects, if registered.
    pub fn required_role(&self, method: &str) -> Option<Role> {
        self.handlers.get(method).map(|r| r.role)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
