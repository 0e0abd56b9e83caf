//! Built-in handler modules and registration.

pub mod bundles;
pub mod files;
pub mod settings;
pub mod system;

use std::path::PathBuf;

use serde_json::Value;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodRegistry;
use crate::roles::Role;

/// Register every built-in handler.
pub fn register_builtin(registry: &mut MethodRegistry) {
    // System
    registry.register("system.ping", Role::None, system::PingHandler);
    registry.register("system.methods", Role::Viewer, system::MethodsHandler);

    // Settings
    registry.register("loadSettings", Role::Viewer, settings::LoadSettingsHandler);
    registry.register("saveSettings", Role::Operator, settings::SaveSettingsHandler);

    // Host files
    registry.register("readHostFile", Role::Admin, files::ReadHostFileHandler);
    registry.register("getFileAsBase64", Role::Admin, files::FileAsBase64Handler);
    registry.register("getTextContent", Role::Admin, files::TextContentHandler);

    // Remote bundles
    registry.register("uploadRemoteBundle", Role::Admin, bundles::UploadBundleHandler);
    registry.register("listRemoteBundles", Role::Viewer, bundles::ListBundlesHandler);
    registry.register(
        "setRemoteBundleVersion",
        Role::Operator,
        bundles::SetBundleVersionHandler,
    );
}

/// Extract a required parameter from the params object.
pub(crate) fn require_param<'a>(params: &'a Value, key: &str) -> Result<&'a Value, RpcError> {
    params
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RpcError::invalid_params(format!("{key} is required")))
}

/// Extract a required non-empty string parameter.
pub(crate) fn require_string_param(params: &Value, key: &str) -> Result<String, RpcError> {
    require_param(params, key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| RpcError::invalid_params(format!("{key} is required")))
}

/// Roots remote file reads are confined to: `remoteAllowedRoots`, or the
/// data directory when that list is missing or empty.
pub(crate) async fn allowed_read_roots(ctx: &RpcContext) -> Result<Vec<PathBuf>, RpcError> {
    let doc = ctx.settings.read().await?;
    Ok(gateway_settings::store::allowed_roots(&doc)
        .filter(|roots| !roots.is_empty())
        .unwrap_or_else(|| vec![ctx.paths.data_dir.clone()]))
}
