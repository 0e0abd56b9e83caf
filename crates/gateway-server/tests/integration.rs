//! End-to-end tests against a real listener using WebSocket and HTTP
//! clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use gateway_core::audit::AuditSink;
use gateway_rpc::handlers::register_builtin;
use gateway_rpc::{
    GatewayPaths, MethodHandler, MethodRegistry, Role, RpcContext, RpcError, SessionContext,
};
use gateway_server::websocket::broadcast::BroadcastManager;
use gateway_server::{GatewayServer, ServerConfig};
use gateway_settings::InMemorySettingsStore;

const TIMEOUT: Duration = Duration::from_secs(5);
const TOKEN: &str = "test-token";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// ── Test handlers ──

struct CountingHandler(Arc<AtomicUsize>);

#[async_trait]
impl MethodHandler for CountingHandler {
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        _ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let _ = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "echo": params, "clientId": session.client_id }))
    }
}

/// Blocks until the test releases a permit.
struct GatedHandler(Arc<Semaphore>);

#[async_trait]
impl MethodHandler for GatedHandler {
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        _ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let permit = self.0.acquire().await.map_err(|e| RpcError::Internal {
            message: e.to_string(),
        })?;
        permit.forget();
        Ok(json!("released"))
    }
}

struct FailingHandler;

#[async_trait]
impl MethodHandler for FailingHandler {
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        _ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        Err(RpcError::NotFound {
            message: "agent xyz does not exist".into(),
        })
    }
}

struct PanickingHandler;

#[async_trait]
impl MethodHandler for PanickingHandler {
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        _ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        panic!("handler bug");
    }
}

// ── Harness ──

struct TestGateway {
    server: GatewayServer,
    ws_url: String,
    http_url: String,
    calls: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
    dir: TempDir,
}

fn test_config() -> ServerConfig {
    ServerConfig {
        max_concurrent_rpc: 2,
        max_payload_bytes: 1024,
        ..ServerConfig::default()
    }
    .with_token(TOKEN)
}

async fn boot_server() -> TestGateway {
    boot_server_with(test_config()).await
}

async fn boot_server_with(config: ServerConfig) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let broadcast = Arc::new(BroadcastManager::new());
    let ctx = Arc::new(RpcContext::new(
        Arc::new(InMemorySettingsStore::new(json!({}))),
        Arc::new(AuditSink::in_dir(dir.path())),
        broadcast.clone(),
        GatewayPaths::new(dir.path()),
    ));

    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let mut registry = MethodRegistry::new();
    register_builtin(&mut registry);
    registry.register("test.count", Role::None, CountingHandler(calls.clone()));
    registry.register("test.wait", Role::None, GatedHandler(gate.clone()));
    registry.register("test.fail", Role::None, FailingHandler);
    registry.register("test.panic", Role::None, PanickingHandler);

    let server = GatewayServer::new(config, registry, ctx, broadcast);
    let (addr, _handle) = server.listen().await.unwrap();

    TestGateway {
        server,
        ws_url: format!("ws://{addr}/ws"),
        http_url: format!("http://{addr}"),
        calls,
        gate,
        dir,
    }
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send_json(ws: &mut WsStream, value: &Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Connect, consume `hello`, and authenticate.
async fn connect_authenticated(url: &str, client_id: &str) -> WsStream {
    let mut ws = connect(url).await;
    assert_eq!(read_json(&mut ws).await["type"], "hello");
    send_json(&mut ws, &json!({"type": "auth", "token": TOKEN, "clientId": client_id})).await;
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "auth_result");
    assert_eq!(reply["success"], true);
    ws
}

/// Send an rpc and read until the matching `rpc_result`.
async fn rpc_call(ws: &mut WsStream, id: &str, method: &str, params: Value) -> Value {
    send_json(
        ws,
        &json!({"type": "rpc", "id": id, "method": method, "params": params}),
    )
    .await;
    loop {
        let parsed = read_json(ws).await;
        if parsed["type"] == "rpc_result" && parsed["id"] == id {
            return parsed;
        }
    }
}

/// Whether the peer closes the socket within the timeout.
async fn closes_within_timeout(ws: &mut WsStream) -> bool {
    timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .unwrap_or(false)
}

/// Whether no text frame arrives within `window`.
async fn stays_silent(ws: &mut WsStream, window: Duration) -> bool {
    timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(_))) => return,
                Some(Ok(_)) => {}
                None | Some(Err(_)) => std::future::pending::<()>().await,
            }
        }
    })
    .await
    .is_err()
}

async fn wait_for_connection_count(gw: &TestGateway, expected: usize) {
    timeout(TIMEOUT, async {
        while gw.server.broadcast().connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never reached expected value");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_hello_on_connect() {
    let gw = boot_server().await;
    let mut ws = connect(&gw.ws_url).await;

    let hello = read_json(&mut ws).await;
    assert_eq!(
        hello,
        json!({"type": "hello", "protocolVersion": 1, "protocolCompat": [1], "requiresAuth": true})
    );
}

#[tokio::test]
async fn e2e_root_path_also_upgrades() {
    let gw = boot_server().await;
    let url = gw.ws_url.trim_end_matches("/ws").to_owned() + "/";
    let mut ws = connect(&url).await;
    assert_eq!(read_json(&mut ws).await["type"], "hello");
}

#[tokio::test]
async fn e2e_rpc_before_auth_is_rejected() {
    let gw = boot_server().await;
    let mut ws = connect(&gw.ws_url).await;
    let _ = read_json(&mut ws).await;

    for id in ["a", "b"] {
        send_json(&mut ws, &json!({"type": "rpc", "id": id, "method": "test.count"})).await;
        assert_eq!(
            read_json(&mut ws).await,
            json!({"type": "error", "error": "Not authenticated"})
        );
    }
    assert_eq!(gw.calls.load(Ordering::SeqCst), 0);

    // Still open: auth on the same socket works.
    send_json(&mut ws, &json!({"type": "auth", "token": TOKEN})).await;
    assert_eq!(read_json(&mut ws).await["success"], true);
}

#[tokio::test]
async fn e2e_bad_token_closes_then_fresh_socket_succeeds() {
    let gw = boot_server().await;
    let mut ws = connect(&gw.ws_url).await;
    let _ = read_json(&mut ws).await;

    send_json(&mut ws, &json!({"type": "auth", "token": "bad"})).await;
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "auth_result");
    assert_eq!(reply["success"], false);
    assert!(closes_within_timeout(&mut ws).await);

    let mut ws = connect_authenticated(&gw.ws_url, "phone").await;
    let result = rpc_call(&mut ws, "r1", "test.count", json!({"n": 1})).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["result"]["echo"], json!({"n": 1}));
    assert_eq!(result["result"]["clientId"], "phone");
}

#[tokio::test]
async fn e2e_wrongly_typed_auth_token_closes() {
    let gw = boot_server().await;
    let mut ws = connect(&gw.ws_url).await;
    let _ = read_json(&mut ws).await;

    send_json(&mut ws, &json!({"type": "auth", "token": 123})).await;
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "auth_result");
    assert_eq!(reply["success"], false);
    assert!(closes_within_timeout(&mut ws).await);
}

#[tokio::test]
async fn e2e_auth_is_audited() {
    let gw = boot_server().await;
    let _ws = connect_authenticated(&gw.ws_url, "tablet").await;

    // Written after the reply goes out.
    let records = timeout(TIMEOUT, async {
        loop {
            let records = gw.server.context().audit.read_all().await.unwrap_or_default();
            if !records.is_empty() {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("auth never audited");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "auth.success");
    assert_eq!(records[0].client_id, "tablet");
    assert_eq!(records[0].role, "unknown");
}

#[tokio::test]
async fn e2e_generated_client_id() {
    let gw = boot_server().await;
    let mut ws = connect(&gw.ws_url).await;
    let _ = read_json(&mut ws).await;
    send_json(&mut ws, &json!({"type": "auth", "token": TOKEN})).await;
    let reply = read_json(&mut ws).await;
    assert!(reply["clientId"].as_str().unwrap().starts_with("client_"));
}

#[tokio::test]
async fn e2e_concurrency_limit_rejects_extra_request() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    for id in ["w1", "w2", "w3"] {
        send_json(&mut ws, &json!({"type": "rpc", "id": id, "method": "test.wait"})).await;
    }
    let refused = read_json(&mut ws).await;
    assert_eq!(refused["type"], "rpc_result");
    assert_eq!(refused["id"], "w3");
    assert_eq!(refused["success"], false);
    assert_eq!(refused["code"], "CONCURRENCY_LIMIT");
    assert_eq!(refused["error"], "Too many concurrent RPC. Limit=2");

    gw.gate.add_permits(2);
    let mut ids = vec![
        read_json(&mut ws).await["id"].as_str().unwrap().to_owned(),
        read_json(&mut ws).await["id"].as_str().unwrap().to_owned(),
    ];
    ids.sort();
    assert_eq!(ids, vec!["w1", "w2"]);

    // Slots are released: two more calls fit again.
    let result = rpc_call(&mut ws, "after", "test.count", json!({})).await;
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn e2e_slow_call_does_not_block_others() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    send_json(&mut ws, &json!({"type": "rpc", "id": "slow", "method": "test.wait"})).await;
    let fast = rpc_call(&mut ws, "fast", "test.count", json!({})).await;
    assert_eq!(fast["success"], true);

    gw.gate.add_permits(1);
    let slow = read_json(&mut ws).await;
    assert_eq!(slow["id"], "slow");
    assert_eq!(slow["result"], "released");
}

#[tokio::test]
async fn e2e_exactly_one_result_per_accepted_request() {
    let gw = boot_server_with(
        ServerConfig {
            max_concurrent_rpc: 8,
            ..test_config()
        },
    )
    .await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    let calls = [
        ("1", "test.count"),
        ("2", "test.fail"),
        ("3", "test.panic"),
        ("4", "no.such.method"),
        ("5", "system.ping"),
    ];
    for (id, method) in calls {
        send_json(&mut ws, &json!({"type": "rpc", "id": id, "method": method})).await;
    }

    let mut results = Vec::new();
    for _ in 0..calls.len() {
        results.push(read_json(&mut ws).await);
    }
    assert!(stays_silent(&mut ws, Duration::from_millis(300)).await);

    let by_id = |id: &str| {
        let matching: Vec<&Value> = results.iter().filter(|r| r["id"] == id).collect();
        assert_eq!(matching.len(), 1, "expected exactly one result for {id}");
        matching[0].clone()
    };
    assert_eq!(by_id("1")["success"], true);

    let failed = by_id("2");
    assert_eq!(failed["success"], false);
    assert_eq!(failed["error"], "agent xyz does not exist");
    assert_eq!(failed["code"], "NOT_FOUND");

    let panicked = by_id("3");
    assert_eq!(panicked["code"], "INTERNAL_ERROR");

    let unknown = by_id("4");
    assert_eq!(unknown["code"], "METHOD_NOT_FOUND");
    assert_eq!(unknown["error"], "Unknown method: no.such.method");

    assert_eq!(by_id("5")["result"]["pong"], true);
}

#[tokio::test]
async fn e2e_numeric_and_structured_ids_echo_verbatim() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    send_json(&mut ws, &json!({"type": "rpc", "id": 42, "method": "system.ping"})).await;
    assert_eq!(read_json(&mut ws).await["id"], 42);

    send_json(&mut ws, &json!({"type": "rpc", "id": {"seq": 1}, "method": "system.ping"})).await;
    assert_eq!(read_json(&mut ws).await["id"], json!({"seq": 1}));
}

#[tokio::test]
async fn e2e_payload_too_large_keeps_connection_open() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    let big = json!({"type": "rpc", "id": "big", "method": "test.count", "params": {"blob": "x".repeat(2000)}});
    send_json(&mut ws, &big).await;
    assert_eq!(
        read_json(&mut ws).await,
        json!({"type": "error", "error": "Payload too large. Max 1024 bytes"})
    );
    assert_eq!(gw.calls.load(Ordering::SeqCst), 0);

    let result = rpc_call(&mut ws, "small", "test.count", json!({})).await;
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn e2e_protocol_errors_keep_connection_open() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    ws.send(Message::text("{not json")).await.unwrap();
    let invalid = read_json(&mut ws).await;
    assert_eq!(invalid["type"], "error");
    assert!(invalid["error"].as_str().unwrap().starts_with("Invalid message: "));

    send_json(&mut ws, &json!({"type": "subscribe"})).await;
    assert_eq!(
        read_json(&mut ws).await["error"],
        "Unknown message type: subscribe"
    );

    let result = rpc_call(&mut ws, "ok", "system.ping", json!({})).await;
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn e2e_binary_utf8_frames_are_accepted() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    let frame = json!({"type": "rpc", "id": "bin", "method": "system.ping"}).to_string();
    ws.send(Message::binary(frame.into_bytes())).await.unwrap();
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["id"], "bin");
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn e2e_non_utf8_binary_frame_gets_protocol_error() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    ws.send(Message::binary(vec![0xff, 0xfe])).await.unwrap();
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "error");
    assert!(reply["error"].as_str().unwrap().starts_with("Invalid message: "));

    ws.send(Message::binary(vec![0xff; 2000])).await.unwrap();
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["error"], "Payload too large. Max 1024 bytes");

    let result = rpc_call(&mut ws, "after", "system.ping", json!({})).await;
    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn e2e_publish_reaches_only_authenticated_clients() {
    let gw = boot_server().await;
    let mut a = connect_authenticated(&gw.ws_url, "a").await;
    let mut b = connect_authenticated(&gw.ws_url, "b").await;
    let mut pending = connect(&gw.ws_url).await;
    let _ = read_json(&mut pending).await;
    wait_for_connection_count(&gw, 3).await;

    let delivered = gw
        .server
        .context()
        .events
        .publish("agent.created", json!({"agentId": "x1"}))
        .await;
    assert_eq!(delivered, 2);

    for ws in [&mut a, &mut b] {
        assert_eq!(
            read_json(ws).await,
            json!({"type": "event", "event": "agent.created", "payload": {"agentId": "x1"}})
        );
    }
    assert!(stays_silent(&mut pending, Duration::from_millis(300)).await);
}

#[tokio::test]
async fn e2e_publish_to_single_client() {
    let gw = boot_server().await;
    let mut a = connect_authenticated(&gw.ws_url, "a").await;
    let mut b = connect_authenticated(&gw.ws_url, "b").await;
    wait_for_connection_count(&gw, 2).await;

    let target = gw
        .server
        .broadcast()
        .snapshot()
        .await
        .into_iter()
        .find(|c| c.client_id().as_deref() == Some("a"))
        .unwrap();
    assert!(
        gw.server
            .context()
            .events
            .publish_to(&target.id, "direct", json!({}))
            .await
    );
    assert_eq!(read_json(&mut a).await["event"], "direct");
    assert!(stays_silent(&mut b, Duration::from_millis(300)).await);
}

#[tokio::test]
async fn e2e_save_settings_notifies_other_clients() {
    let gw = boot_server().await;
    let mut writer = connect_authenticated(&gw.ws_url, "writer").await;
    let mut watcher = connect_authenticated(&gw.ws_url, "watcher").await;

    let saved = rpc_call(
        &mut writer,
        "s1",
        "saveSettings",
        json!({"settingsPatch": {"theme": "dark"}}),
    )
    .await;
    assert_eq!(saved["success"], true);
    assert_eq!(saved["result"]["theme"], "dark");

    let event = read_json(&mut watcher).await;
    assert_eq!(event["event"], "settings.updated");
    assert_eq!(event["payload"]["by"], "writer");
    assert_eq!(event["payload"]["keys"], json!(["theme"]));

    let loaded = rpc_call(&mut watcher, "l1", "loadSettings", json!({})).await;
    assert_eq!(loaded["result"]["theme"], "dark");
}

#[tokio::test]
async fn e2e_sandbox_denies_and_audits() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    let inside = gw.dir.path().join("inside.txt");
    std::fs::write(&inside, "ok").unwrap();
    let allowed = rpc_call(
        &mut ws,
        "in",
        "readHostFile",
        json!({"filePath": inside.to_str().unwrap()}),
    )
    .await;
    assert_eq!(allowed["result"]["content"], "ok");

    let escape = gw.dir.path().join("sub/../../outside.txt");
    let denied = rpc_call(
        &mut ws,
        "out",
        "readHostFile",
        json!({"filePath": escape.to_str().unwrap()}),
    )
    .await;
    assert_eq!(denied["success"], false);
    assert_eq!(denied["code"], "PATH_NOT_ALLOWED");

    let records = gw.server.context().audit.read_all().await.unwrap();
    let denial = records
        .iter()
        .find(|r| r.action == "sandbox.denied")
        .expect("sandbox denial audited");
    assert_eq!(denial.details["method"], "readHostFile");
    assert_eq!(denial.client_id, "c");
}

#[tokio::test]
async fn e2e_client_disconnect_removes_connection() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;
    wait_for_connection_count(&gw, 1).await;

    ws.close(None).await.unwrap();
    wait_for_connection_count(&gw, 0).await;
}

#[tokio::test]
async fn e2e_heartbeat_terminates_silent_connection() {
    let gw = boot_server_with(ServerConfig {
        heartbeat_interval: Duration::from_millis(100),
        ..test_config()
    })
    .await;

    // Never polled after auth, so it never answers pings.
    let _silent = connect_authenticated(&gw.ws_url, "silent").await;

    // Polled continuously, so pings are answered.
    let mut live = connect_authenticated(&gw.ws_url, "live").await;
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = live.next().await {
            if let Message::Text(text) = msg {
                let _ = events_tx.send(serde_json::from_str::<Value>(&text).unwrap());
            }
        }
    });

    wait_for_connection_count(&gw, 1).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    let remaining = gw.server.broadcast().snapshot().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].client_id().as_deref(), Some("live"));

    let delivered = gw
        .server
        .context()
        .events
        .publish("after.sweep", json!({}))
        .await;
    assert_eq!(delivered, 1);
    let event = timeout(TIMEOUT, events_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event["event"], "after.sweep");
    reader.abort();
}

#[tokio::test]
async fn e2e_shutdown_closes_sessions() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;
    wait_for_connection_count(&gw, 1).await;

    gw.server.shutdown().shutdown();
    assert!(closes_within_timeout(&mut ws).await);
}

// ── HTTP side channel ──

#[tokio::test]
async fn e2e_http_health_and_meta() {
    let gw = boot_server().await;
    let _ws = connect_authenticated(&gw.ws_url, "c").await;
    wait_for_connection_count(&gw, 1).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", gw.http_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 1);
    assert_eq!(health["authenticated"], 1);

    let resp = client
        .get(format!("{}/meta", gw.http_url))
        .header("Origin", "http://elsewhere.test")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().contains_key("access-control-allow-origin"));
    let meta: Value = resp.json().await.unwrap();
    assert_eq!(meta["protocolVersion"], 1);
    assert_eq!(meta["mode"], "disabled");
}

#[tokio::test]
async fn e2e_http_bundle_upload_then_fetch() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;

    // "<h1>hi</h1>" in base64.
    let uploaded = rpc_call(
        &mut ws,
        "up",
        "uploadRemoteBundle",
        json!({"platform": "mobile", "fileName": "index.html", "base64": "PGgxPmhpPC9oMT4="}),
    )
    .await;
    assert_eq!(uploaded["success"], true);

    let resp = reqwest::get(format!("{}/remote-bundles/mobile/index.html", gw.http_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert_eq!(resp.text().await.unwrap(), "<h1>hi</h1>");

    let missing = reqwest::get(format!("{}/remote-bundles/mobile/gone.js", gw.http_url))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn e2e_http_manifest_tracks_published_version() {
    let gw = boot_server().await;
    let mut ws = connect_authenticated(&gw.ws_url, "c").await;
    let _ = rpc_call(&mut ws, "v", "setRemoteBundleVersion", json!({"version": "9.9"})).await;

    let manifest: Value = reqwest::get(format!("{}/remote-manifest", gw.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(manifest["version"], "9.9");
    assert!(
        manifest["mobileBundleUrl"]
            .as_str()
            .unwrap()
            .ends_with("/remote-bundles/mobile/index.html")
    );
}

#[tokio::test]
async fn e2e_http_unknown_route() {
    let gw = boot_server().await;
    let resp = reqwest::get(format!("{}/nope", gw.http_url)).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Not Found");
}
