//! # remote-gateway
//!
//! Gateway binary: loads configuration, wires the settings store, audit
//! sink and built-in handlers into the server, and runs until Ctrl-C or
//! SIGTERM.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use gateway_core::audit::AuditSink;
use gateway_logging::{LoggingConfig, init_logging};
use gateway_rpc::handlers::register_builtin;
use gateway_rpc::roles::gate_for;
use gateway_rpc::{GatewayPaths, MethodRegistry, RpcContext};
use gateway_server::metrics::install_recorder;
use gateway_server::websocket::broadcast::BroadcastManager;
use gateway_server::{GatewayServer, ServerConfig};
use gateway_settings::{
    GatewaySettings, JsonFileSettingsStore, config_path, default_data_dir, load_settings_from_path,
    resolve_data_dir,
};

/// Remote gateway server.
#[derive(Parser, Debug)]
#[command(name = "remote-gateway", about = "Authenticated WebSocket RPC gateway")]
struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Shared auth token (overrides config).
    #[arg(long)]
    token: Option<String>,

    /// Application data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to `<data-dir>/gateway.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Config file to load.
    fn config_file(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            let dir = self.data_dir.clone().unwrap_or_else(default_data_dir);
            config_path(&dir)
        })
    }

    /// Apply flag overrides on top of file and env values.
    fn apply(&self, settings: &mut GatewaySettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref token) = self.token {
            settings.server.token.clone_from(token);
        }
        if let Some(ref dir) = self.data_dir {
            settings.server.data_dir = dir.to_string_lossy().into_owned();
        }
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config_file = args.config_file();
    let mut settings = load_settings_from_path(&config_file)
        .with_context(|| format!("Failed to load config: {}", config_file.display()))?;
    args.apply(&mut settings);

    let _ = init_logging(&LoggingConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ));
    let metrics = install_recorder();

    let data_dir = resolve_data_dir(&settings.server.data_dir);
    ensure_dir(&data_dir)?;
    tracing::info!(
        data_dir = %data_dir.display(),
        config = %config_file.display(),
        role_enforcement = ?settings.server.role_enforcement,
        "configuration loaded"
    );
    if settings.server.token.is_empty() {
        tracing::warn!("no auth token configured; every auth attempt will be rejected");
    }

    let mut registry = MethodRegistry::with_gate(gate_for(settings.server.role_enforcement));
    register_builtin(&mut registry);
    let method_count = registry.methods().len();

    let broadcast = Arc::new(BroadcastManager::new());
    let ctx = Arc::new(RpcContext::new(
        Arc::new(JsonFileSettingsStore::in_dir(&data_dir)),
        Arc::new(AuditSink::in_dir(&data_dir)),
        broadcast.clone(),
        GatewayPaths::new(&data_dir),
    ));

    let config = ServerConfig::from_settings(&settings.server);
    let server = GatewayServer::new(config, registry, ctx, broadcast).with_metrics(metrics);

    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;

    tracing::info!("remote gateway listening on ws://{addr}/ws ({method_count} RPC methods registered)");

    shutdown_signal().await?;

    server.shutdown().trigger("signal");
    if !server.shutdown().drain(vec![handle], None).await {
        tracing::warn!("forced exit before all sessions closed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
