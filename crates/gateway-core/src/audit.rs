//! Append-only audit trail.
//!
//! Each security-relevant action produces one JSON object per line in
//! `<dataDir>/remote_gateway_audit.log`. Writes are serialized so lines never
//! interleave. Recording is best-effort: a failed write is logged and never
//! changes the outcome of the action being audited.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// File name of the audit log inside the data directory.
pub const AUDIT_FILE_NAME: &str = "remote_gateway_audit.log";

const UNKNOWN: &str = "unknown";

/// Audit write failure.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Filesystem error.
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized.
    #[error("audit serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line of the audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Action name, e.g. `auth.success` or `sandbox.denied`.
    pub action: String,
    /// Acting client, or `unknown`.
    pub client_id: String,
    /// Presented role, or `unknown`.
    pub role: String,
    /// Action-specific details.
    pub details: Value,
}

/// Who performed an audited action. Either field may be missing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuditActor<'a> {
    /// Client id, if the session is authenticated.
    pub client_id: Option<&'a str>,
    /// Role the client presented, if any.
    pub role: Option<&'a str>,
}

impl<'a> AuditActor<'a> {
    /// Actor with both fields known.
    pub fn new(client_id: &'a str, role: Option<&'a str>) -> Self {
        Self {
            client_id: Some(client_id),
            role,
        }
    }

    /// Actor for requests that carry no session (plain HTTP).
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Serialized writer for the audit log.
pub struct AuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditSink {
    /// Sink writing to an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Sink writing to [`AUDIT_FILE_NAME`] inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(AUDIT_FILE_NAME))
    }

    /// Path of the audit log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, logging and swallowing any failure.
    pub async fn record(&self, action: &str, actor: AuditActor<'_>, details: Value) {
        if let Err(e) = self.try_record(action, actor, details).await {
            warn!(action, error = %e, path = %self.path.display(), "audit write failed");
        }
    }

    /// Append a record, returning any failure to the caller.
    pub async fn try_record(
        &self,
        action: &str,
        actor: AuditActor<'_>,
        details: Value,
    ) -> Result<(), AuditError> {
        let record = AuditRecord {
            timestamp: chrono::Utc::now().timestamp_millis(),
            action: action.to_owned(),
            client_id: actor.client_id.unwrap_or(UNKNOWN).to_owned(),
            role: actor.role.unwrap_or(UNKNOWN).to_owned(),
            details,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every record back. Unparseable lines are skipped.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
