//! Host file handlers: readHostFile, getFileAsBase64, getTextContent.
//!
//! Every read is confined to the allowed roots before the filesystem is
//! touched.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::instrument;

use gateway_core::sandbox;

use crate::context::{RpcContext, SessionContext};
use crate::errors::RpcError;
use crate::handlers::{allowed_read_roots, require_string_param};
use crate::registry::MethodHandler;

/// Validate `filePath` and return it with its sandboxed resolution.
async fn sandboxed_target(params: &Value, ctx: &RpcContext) -> Result<(String, PathBuf), RpcError> {
    let file_path = require_string_param(params, "filePath")?;
    let roots = allowed_read_roots(ctx).await?;
    let resolved = sandbox::ensure_allowed(&file_path, &roots)?;
    Ok((file_path, resolved))
}

/// Read a UTF-8 file.
pub struct ReadHostFileHandler;

#[async_trait]
impl MethodHandler for ReadHostFileHandler {
    #[instrument(skip_all, fields(method = "readHostFile"))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let (file_path, resolved) = sandboxed_target(&params, ctx).await?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| RpcError::from_io(&e, &file_path))?;

        ctx.audit
            .record("file.read", session.actor(), json!({ "filePath": file_path }))
            .await;
        Ok(json!({ "filePath": file_path, "content": content }))
    }
}

/// Read any file as base64.
pub struct FileAsBase64Handler;

#[async_trait]
impl MethodHandler for FileAsBase64Handler {
    #[instrument(skip_all, fields(method = "getFileAsBase64"))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let (file_path, resolved) = sandboxed_target(&params, ctx).await?;
        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| RpcError::from_io(&e, &file_path))?;

        ctx.audit
            .record(
                "file.base64.read",
                session.actor(),
                json!({ "filePath": file_path, "bytes": bytes.len() }),
            )
            .await;
        Ok(json!({
            "success": true,
            "filePath": file_path,
            "base64": STANDARD.encode(&bytes),
        }))
    }
}

/// Read a text file. With `fileType: "json"` the content is re-emitted
/// pretty-printed.
pub struct TextContentHandler;

#[async_trait]
impl MethodHandler for TextContentHandler {
    #[instrument(skip_all, fields(method = "getTextContent"))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let (file_path, resolved) = sandboxed_target(&params, ctx).await?;
        let file_type = params
            .get("fileType")
            .and_then(Value::as_str)
            .unwrap_or("text")
            .to_owned();

        let raw = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| RpcError::from_io(&e, &file_path))?;
        let content = if file_type == "json" {
            let parsed: Value = serde_json::from_str(&raw).map_err(|e| {
                RpcError::invalid_params(format!("{file_path} is not valid JSON: {e}"))
            })?;
            serde_json::to_string_pretty(&parsed).map_err(|e| RpcError::Internal {
                message: e.to_string(),
            })?
        } else {
            raw
        };

        ctx.audit
            .record(
                "file.text.read",
                session.actor(),
                json!({ "filePath": file_path, "fileType": file_type }),
            )
            .await;
        Ok(json!({ "success": true, "filePath": file_path, "content": content }))
    }
}
