//! `GatewayServer`: Axum HTTP + WebSocket listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use gateway_rpc::{MethodRegistry, RpcContext};
use gateway_settings::store::gateway_enabled;

use crate::bundles;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse, MetaResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::heartbeat::HeartbeatMonitor;
use crate::websocket::session::run_ws_session;

/// Smallest transport-level message cap handed to the WebSocket codec.
const MIN_TRANSPORT_MESSAGE_BYTES: usize = 64 << 20;

/// Listener failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Could not bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Other socket failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// State shared by every route and session.
#[derive(Clone)]
pub struct GatewayState {
    /// Listener configuration.
    pub config: Arc<ServerConfig>,
    /// Method registry.
    pub registry: Arc<MethodRegistry>,
    /// Handler context.
    pub ctx: Arc<RpcContext>,
    /// Live connection registry.
    pub broadcast: Arc<BroadcastManager>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl GatewayState {
    /// Settings document, or `{}` when the store fails.
    pub async fn settings_snapshot(&self) -> Value {
        match self.ctx.settings.read().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "settings unavailable, using empty document");
                json!({})
            }
        }
    }
}

/// The remote gateway server.
pub struct GatewayServer {
    state: GatewayState,
}

impl GatewayServer {
    /// Create a server.
    ///
    /// `broadcast` must be the same registry `ctx.events` publishes through,
    /// otherwise handler events never reach clients.
    pub fn new(
        config: ServerConfig,
        registry: MethodRegistry,
        ctx: Arc<RpcContext>,
        broadcast: Arc<BroadcastManager>,
    ) -> Self {
        ctx.install_catalog(registry.catalog());
        Self {
            state: GatewayState {
                config: Arc::new(config),
                registry: Arc::new(registry),
                ctx,
                broadcast,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                metrics: None,
            },
        }
    }

    /// Expose `/metrics` through `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/meta", get(meta_handler))
            .route("/metrics", get(metrics_handler))
            .route("/remote-manifest", get(bundles::manifest_handler))
            .route("/remote-bundles/{*path}", get(bundles::bundle_file_handler))
            .fallback(not_found)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self.state.clone()))
    }

    /// Bind, start the heartbeat, and serve until shutdown.
    ///
    /// Returns the bound address and a handle that completes once the
    /// listener and heartbeat have stopped.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let config = &self.state.config;
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "gateway listening");

        let heartbeat = HeartbeatMonitor::new(
            Arc::clone(&self.state.broadcast),
            config.heartbeat_interval,
        );
        let heartbeat_handle = tokio::spawn(heartbeat.run(self.state.shutdown.token()));

        let router = self.router();
        let token = self.state.shutdown.token();
        let broadcast = Arc::clone(&self.state.broadcast);
        let handle = tokio::spawn(async move {
            let stop = async move {
                token.cancelled().await;
                let open = broadcast.snapshot().await;
                debug!(connections = open.len(), "closing open sessions");
                for conn in open {
                    conn.terminate();
                }
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(stop)
                .await
            {
                error!(error = %e, "server error");
            }
            let _ = heartbeat_handle.await;
            info!("gateway stopped");
        });

        Ok((local_addr, handle))
    }

    /// Get the broadcast manager.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.state.broadcast
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get the method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.state.registry
    }

    /// Get the handler context.
    pub fn context(&self) -> &Arc<RpcContext> {
        &self.state.ctx
    }
}

fn transport_message_limit(max_payload_bytes: usize) -> usize {
    max_payload_bytes
        .saturating_mul(2)
        .max(MIN_TRANSPORT_MESSAGE_BYTES)
}

/// GET / and GET /ws. Only upgrade requests are accepted.
///
/// The codec cap sits above the configured payload cap so oversized
/// frames reach the session and are refused with a protocol error instead
/// of killing the socket.
async fn ws_handler(
    State(state): State<Arc<GatewayState>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(ws) = upgrade else {
        return not_found().await.into_response();
    };
    let limit = transport_message_limit(state.config.max_payload_bytes);
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| run_ws_session(socket, state))
}

/// GET /health
async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    let connections = state.broadcast.connection_count().await;
    let authenticated = state.broadcast.authenticated_count().await;
    Json(health::health_check(state.start_time, connections, authenticated))
}

/// GET /meta
async fn meta_handler(State(state): State<Arc<GatewayState>>) -> Json<MetaResponse> {
    let settings = state.settings_snapshot().await;
    Json(health::meta(gateway_enabled(&settings)))
}

/// GET /metrics
async fn metrics_handler(State(state): State<Arc<GatewayState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => not_found().await.into_response(),
    }
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}
