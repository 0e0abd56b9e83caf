//! Remote UI bundle handlers: upload, list, set version.

use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{info, instrument};

use gateway_core::sandbox;
use gateway_settings::store::{KEY_BUNDLE_UPDATED_AT, KEY_BUNDLE_VERSION};

use crate::context::{RpcContext, SessionContext};
use crate::errors::RpcError;
use crate::handlers::require_string_param;
use crate::registry::MethodHandler;

/// Bundle target platforms.
pub const PLATFORMS: &[&str] = &["desktop", "mobile"];

fn require_platform(params: &Value) -> Result<&'static str, RpcError> {
    let requested = params.get("platform").and_then(Value::as_str).unwrap_or("");
    PLATFORMS
        .iter()
        .copied()
        .find(|p| *p == requested)
        .ok_or_else(|| RpcError::invalid_params("platform must be desktop or mobile"))
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

fn io_error(err: &std::io::Error) -> RpcError {
    RpcError::Custom {
        code: crate::errors::FILE_ERROR.into(),
        message: err.to_string(),
    }
}

/// Store a base64-encoded bundle file under the platform directory.
pub struct UploadBundleHandler;

#[async_trait]
impl MethodHandler for UploadBundleHandler {
    #[instrument(skip_all, fields(method = "uploadRemoteBundle"))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let platform = require_platform(&params)?;
        let file_name = require_string_param(&params, "fileName")?;
        let encoded = require_string_param(&params, "base64")?;

        let safe_name = sanitize_file_name(&file_name);
        let root = ctx.paths.platform_bundles(platform);
        let target = sandbox::ensure_allowed(root.join(&safe_name), &[&root])?;
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| RpcError::invalid_params(format!("base64 is invalid: {e}")))?;

        tokio::fs::create_dir_all(&root).await.map_err(|e| io_error(&e))?;
        tokio::fs::write(&target, &bytes).await.map_err(|e| io_error(&e))?;
        info!(platform, file = %safe_name, bytes = bytes.len(), "remote bundle uploaded");

        ctx.audit
            .record(
                "remote.bundle.upload",
                session.actor(),
                json!({ "platform": platform, "fileName": safe_name, "bytes": bytes.len() }),
            )
            .await;
        Ok(json!({ "success": true, "path": target.display().to_string() }))
    }
}

/// List bundle files for a platform, newest first.
pub struct ListBundlesHandler;

#[async_trait]
impl MethodHandler for ListBundlesHandler {
    async fn handle(
        &self,
        params: Value,
        _session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let platform = require_platform(&params)?;
        let root = ctx.paths.platform_bundles(platform);
        tokio::fs::create_dir_all(&root).await.map_err(|e| io_error(&e))?;

        let mut entries = tokio::fs::read_dir(&root).await.map_err(|e| io_error(&e))?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&e))? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let mtime_ms = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_millis() as u64);
            files.push((entry.file_name().to_string_lossy().into_owned(), meta.len(), mtime_ms));
        }
        files.sort_by(|a, b| b.2.cmp(&a.2));

        let files: Vec<Value> = files
            .into_iter()
            .map(|(name, size, mtime_ms)| json!({ "name": name, "size": size, "mtimeMs": mtime_ms }))
            .collect();
        Ok(json!({ "success": true, "platform": platform, "files": files }))
    }
}

/// Publish a new bundle version.
pub struct SetBundleVersionHandler;

#[async_trait]
impl MethodHandler for SetBundleVersionHandler {
    #[instrument(skip_all, fields(method = "setRemoteBundleVersion"))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let version = match params.get("version") {
            Some(Value::String(s)) => s.trim().to_owned(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if version.is_empty() {
            return Err(RpcError::invalid_params("version is required"));
        }
        let updated_at = chrono::Utc::now().timestamp_millis();

        let stored = version.clone();
        let _ = ctx
            .settings
            .update(Box::new(move |mut doc| {
                if let Some(map) = doc.as_object_mut() {
                    let _ = map.insert(KEY_BUNDLE_VERSION.into(), json!(stored));
                    let _ = map.insert(KEY_BUNDLE_UPDATED_AT.into(), json!(updated_at));
                }
                doc
            }))
            .await?;

        let _ = ctx
            .events
            .publish(
                "remote.bundle.version.updated",
                json!({ "version": version, "updatedAt": updated_at, "by": session.client_id }),
            )
            .await;
        ctx.audit
            .record(
                "remote.bundle.version.updated",
                session.actor(),
                json!({ "version": version }),
            )
            .await;
        Ok(json!({ "success": true, "version": version }))
    }
}
