//! WebSocket session lifecycle: one connected client from upgrade through
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use gateway_core::ids;
use gateway_rpc::ServerMessage;

use super::connection::{ClientConnection, Outbound};
use super::handler::{FrameOutcome, handle_frame, handle_undecodable};
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::server::GatewayState;

/// How long teardown waits for queued frames to flush.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a session for an upgraded socket.
///
/// 1. Registers the connection and queues `hello`
/// 2. Feeds inbound frames through [`handle_frame`]
/// 3. Stops on client close, transport error, failed auth, or heartbeat
///    termination
/// 4. Deregisters, flushes what is queued, and closes the socket
#[instrument(skip_all, fields(conn_id))]
pub async fn run_ws_session(socket: WebSocket, state: Arc<GatewayState>) {
    let connection_id = ids::connection_id();
    let _ = tracing::Span::current().record("conn_id", connection_id.as_str());
    let (ws_tx, mut ws_rx) = socket.split();

    let (send_tx, send_rx) = mpsc::channel(state.config.outbound_queue_size);
    let connection = Arc::new(ClientConnection::new(
        connection_id,
        send_tx,
        state.config.max_concurrent_rpc,
    ));
    let terminate = connection.termination_token();

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let _ = connection.send_reply(&ServerMessage::hello()).await;
    state.broadcast.add(Arc::clone(&connection)).await;
    let mut writer = tokio::spawn(write_loop(ws_tx, send_rx, terminate.clone()));

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            () = terminate.cancelled() => {
                info!("connection terminated");
                break;
            }
        };
        let Some(Ok(message)) = frame else {
            debug!("transport closed");
            break;
        };

        let text = match message {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    if handle_undecodable(data.len(), &connection, &state).await
                        == FrameOutcome::Close
                    {
                        break;
                    }
                    continue;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                continue;
            }
        };

        if handle_frame(&text, &connection, &state).await == FrameOutcome::Close {
            break;
        }
    }

    connection.close();
    let _ = state.broadcast.remove(&connection.id).await;
    terminate.cancel();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
        .await
        .is_err()
    {
        debug!("writer did not drain in time");
        writer.abort();
    }

    info!(dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

/// Forward queued frames to the socket.
///
/// On termination, frames already queued (such as a failed `auth_result`)
/// are flushed before the close frame.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    terminate: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if sink.send(into_message(frame)).await.is_err() {
                    return;
                }
            }
            () = terminate.cancelled() => {
                while let Ok(frame) = rx.try_recv() {
                    if sink.send(into_message(frame)).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}

fn into_message(frame: Outbound) -> Message {
    match frame {
        Outbound::Text(text) => Message::Text(text.as_str().into()),
        Outbound::Ping => Message::Ping(Vec::new().into()),
    }
}
