//! Inbound frame dispatch: size cap, envelope parsing, auth handshake, and
//! rpc admission.

use std::sync::Arc;

use metrics::counter;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use gateway_core::audit::AuditActor;
use gateway_core::ids;
use gateway_rpc::errors::CONCURRENCY_LIMIT;
use gateway_rpc::{AuthRequest, ClientMessage, ProtocolError, RpcRequest, RpcResponse, ServerMessage};

use super::connection::ClientConnection;
use crate::metrics::{RPC_REJECTED_TOTAL, WS_AUTH_FAILURES_TOTAL};
use crate::server::GatewayState;

/// What the session loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep reading.
    Continue,
    /// Tear the connection down.
    Close,
}

/// Handle one inbound text frame.
///
/// Protocol errors are answered with an `error` envelope and never close
/// the connection. Only a failed auth does. Replies wait for queue space
/// rather than being dropped.
#[instrument(skip_all, fields(conn_id = %conn.id))]
pub async fn handle_frame(
    text: &str,
    conn: &Arc<ClientConnection>,
    state: &GatewayState,
) -> FrameOutcome {
    let max = state.config.max_payload_bytes;
    if text.len() > max {
        warn!(size = text.len(), max, "oversized frame rejected");
        reject(conn, &ProtocolError::PayloadTooLarge { max }).await;
        return FrameOutcome::Continue;
    }

    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(error = %err, "unparseable frame");
            reject(conn, &err).await;
            return FrameOutcome::Continue;
        }
    };

    match message {
        ClientMessage::Auth(auth) => handle_auth(auth, conn, state).await,
        ClientMessage::MalformedAuth(reason) => {
            warn!(%reason, "malformed auth frame, closing connection");
            fail_auth(conn).await
        }
        _ if !conn.is_authenticated() => {
            counter!(RPC_REJECTED_TOTAL, "reason" => "not_authenticated").increment(1);
            reject(conn, &ProtocolError::NotAuthenticated).await;
            FrameOutcome::Continue
        }
        ClientMessage::Rpc(request) => {
            admit_rpc(request, conn, state).await;
            FrameOutcome::Continue
        }
        ClientMessage::Other(kind) => {
            reject(conn, &ProtocolError::UnknownMessageType(kind)).await;
            FrameOutcome::Continue
        }
    }
}

/// Answer a binary frame whose payload is not UTF-8 text.
///
/// The size cap is checked first, on the raw byte length.
#[instrument(skip_all, fields(conn_id = %conn.id))]
pub async fn handle_undecodable(
    len: usize,
    conn: &ClientConnection,
    state: &GatewayState,
) -> FrameOutcome {
    let max = state.config.max_payload_bytes;
    let err = if len > max {
        warn!(size = len, max, "oversized frame rejected");
        ProtocolError::PayloadTooLarge { max }
    } else {
        debug!(len, "binary frame is not UTF-8");
        ProtocolError::InvalidMessage("binary frame is not valid UTF-8".into())
    };
    reject(conn, &err).await;
    FrameOutcome::Continue
}

async fn reject(conn: &ClientConnection, err: &ProtocolError) {
    let _ = conn.send_reply(&ServerMessage::protocol_error(err)).await;
}

async fn fail_auth(conn: &ClientConnection) -> FrameOutcome {
    counter!(WS_AUTH_FAILURES_TOTAL).increment(1);
    let _ = conn.send_reply(&ServerMessage::auth_failed("Invalid token")).await;
    FrameOutcome::Close
}

/// Token check. Runs again on every `auth`, even when already
/// authenticated.
async fn handle_auth(
    auth: AuthRequest,
    conn: &Arc<ClientConnection>,
    state: &GatewayState,
) -> FrameOutcome {
    if !state.config.token_matches(auth.token.as_deref()) {
        warn!("auth failed, closing connection");
        return fail_auth(conn).await;
    }

    let client_id = auth
        .client_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(ids::client_id);
    if !conn.authenticate(client_id.clone(), auth.role.clone()) {
        return FrameOutcome::Close;
    }
    let _ = conn.send_reply(&ServerMessage::auth_ok(client_id.as_str())).await;
    info!(client_id, role = ?auth.role, "client authenticated");

    state
        .ctx
        .audit
        .record(
            "auth.success",
            AuditActor::new(&client_id, auth.role.as_deref()),
            json!({ "connectionId": conn.id }),
        )
        .await;
    FrameOutcome::Continue
}

/// Claim a concurrency slot and run the call on its own task.
///
/// Over the limit, the call is refused immediately with a failed
/// `rpc_result` and no handler runs.
async fn admit_rpc(request: RpcRequest, conn: &Arc<ClientConnection>, state: &GatewayState) {
    let Some(session) = conn.session_context() else {
        reject(conn, &ProtocolError::NotAuthenticated).await;
        return;
    };
    let Some(permit) = conn.try_acquire_rpc_slot() else {
        warn!(method = %request.method, limit = conn.rpc_limit(), "rpc refused, concurrency limit reached");
        counter!(RPC_REJECTED_TOTAL, "reason" => "concurrency_limit").increment(1);
        let response = RpcResponse::error(
            request.id,
            CONCURRENCY_LIMIT,
            format!("Too many concurrent RPC. Limit={}", conn.rpc_limit()),
        );
        let _ = conn.send_reply(&ServerMessage::RpcResult(response)).await;
        return;
    };

    let conn = Arc::clone(conn);
    let registry = Arc::clone(&state.registry);
    let ctx = Arc::clone(&state.ctx);
    let _ = tokio::spawn(async move {
        let response = registry.dispatch(request, &session, &ctx).await;
        if !conn.send_reply(&ServerMessage::RpcResult(response)).await {
            debug!(conn_id = %conn.id, "rpc result not delivered, connection gone");
        }
        drop(permit);
    });
}
