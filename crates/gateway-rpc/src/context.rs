//! Handler context.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use gateway_core::audit::{AuditActor, AuditSink};
use gateway_settings::SettingsStore;

use crate::events::EventSink;
use crate::registry::MethodInfo;

/// Directory name for uploaded remote UI bundles.
pub const BUNDLES_DIR_NAME: &str = "RemoteBundles";

/// Filesystem locations the gateway owns.
#[derive(Clone, Debug)]
pub struct GatewayPaths {
    /// Application data root.
    pub data_dir: PathBuf,
    /// `<data_dir>/RemoteBundles`.
    pub bundles_root: PathBuf,
}

impl GatewayPaths {
    /// Derive every location from the data root.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let bundles_root = data_dir.join(BUNDLES_DIR_NAME);
        Self {
            data_dir,
            bundles_root,
        }
    }

    /// Bundle directory for one platform.
    pub fn platform_bundles(&self, platform: &str) -> PathBuf {
        self.bundles_root.join(platform)
    }

    /// Data root.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Identity of the session issuing a call.
#[derive(Clone, Debug)]
pub struct SessionContext {
    /// Server-internal connection id.
    pub connection_id: String,
    /// Authenticated client id.
    pub client_id: String,
    /// Advisory role label presented at auth.
    pub role: Option<String>,
}

impl SessionContext {
    /// Actor for audit records.
    pub fn actor(&self) -> AuditActor<'_> {
        AuditActor::new(&self.client_id, self.role.as_deref())
    }
}

/// Shared services available to every handler.
pub struct RpcContext {
    /// Persisted settings document.
    pub settings: Arc<dyn SettingsStore>,
    /// Audit trail.
    pub audit: Arc<AuditSink>,
    /// Event publication.
    pub events: Arc<dyn EventSink>,
    /// Owned filesystem locations.
    pub paths: GatewayPaths,
    catalog: OnceLock<Vec<MethodInfo>>,
}

impl RpcContext {
    /// Assemble a context.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        audit: Arc<AuditSink>,
        events: Arc<dyn EventSink>,
        paths: GatewayPaths,
    ) -> Self {
        Self {
            settings,
            audit,
            events,
            paths,
            catalog: OnceLock::new(),
        }
    }

    /// Record the registry's method list for introspection. First call wins.
    pub fn install_catalog(&self, catalog: Vec<MethodInfo>) {
        let _ = self.catalog.set(catalog);
    }

    /// Method list installed by the server, empty before installation.
    pub fn catalog(&self) -> &[MethodInfo] {
        self.catalog.get().map(Vec::as_slice).unwrap_or_default()
    }
}
