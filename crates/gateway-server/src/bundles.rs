//! Remote UI bundle manifest and static file serving.
//!
//! Both endpoints are unauthenticated. Files are only ever served from
//! inside the bundles root.

use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use gateway_core::audit::AuditActor;
use gateway_core::sandbox;
use gateway_settings::store::{bundle_updated_at, bundle_version};

use crate::server::GatewayState;

/// Bundle manifest body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    /// Published bundle version.
    pub version: String,
    /// When the version was published, epoch millis.
    pub updated_at: i64,
    /// Desktop entry point.
    pub desktop_bundle_url: String,
    /// Mobile entry point.
    pub mobile_bundle_url: String,
    /// Free-form description.
    pub notes: String,
}

/// Build the manifest for `host` from the settings document.
///
/// Without a published version both fields fall back to the current time.
pub fn manifest(host: &str, settings: &Value) -> ManifestResponse {
    let now = chrono::Utc::now().timestamp_millis();
    let base = format!("http://{host}");
    ManifestResponse {
        version: bundle_version(settings).map_or_else(|| now.to_string(), str::to_owned),
        updated_at: bundle_updated_at(settings).unwrap_or(now),
        desktop_bundle_url: format!("{base}/remote-bundles/desktop/index.html"),
        mobile_bundle_url: format!("{base}/remote-bundles/mobile/index.html"),
        notes: "Remote bundle manifest for hot-update style loading".into(),
    }
}

/// Content type for a bundle file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// GET /remote-manifest
pub async fn manifest_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Json<ManifestResponse> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map_or_else(
            || format!("{}:{}", state.config.host, state.config.port),
            str::to_owned,
        );
    let settings = state.settings_snapshot().await;
    Json(manifest(&host, &settings))
}

/// GET /remote-bundles/{*path}
pub async fn bundle_file_handler(
    State(state): State<Arc<GatewayState>>,
    UrlPath(relative): UrlPath<String>,
) -> Response {
    let root = &state.ctx.paths.bundles_root;
    let relative = relative.trim_start_matches('/');
    let target = match sandbox::ensure_allowed(root.join(relative), &[root]) {
        Ok(target) => target,
        Err(err) => {
            warn!(path = relative, "bundle request escaped the bundles root");
            state
                .ctx
                .audit
                .record(
                    "sandbox.denied",
                    AuditActor::anonymous(),
                    json!({ "route": "remote-bundles", "path": relative }),
                )
                .await;
            return json_error(StatusCode::FORBIDDEN, err.to_string());
        }
    };

    let is_file = tokio::fs::metadata(&target)
        .await
        .is_ok_and(|meta| meta.is_file());
    if !is_file {
        debug!(path = relative, "bundle file not found");
        return json_error(StatusCode::NOT_FOUND, "Bundle file not found");
    }

    match tokio::fs::read(&target).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&target)))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!(path = relative, error = %e, "failed to read bundle file");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
