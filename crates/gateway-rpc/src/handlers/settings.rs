//! Settings handlers: loadSettings, saveSettings.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::context::{RpcContext, SessionContext};
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Return the persisted settings document.
pub struct LoadSettingsHandler;

#[async_trait]
impl MethodHandler for LoadSettingsHandler {
    #[instrument(skip_all, fields(method = "loadSettings"))]
    async fn handle(
        &self,
        _params: Value,
        _session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        Ok(ctx.settings.read().await?)
    }
}

/// Shallow-merge `settingsPatch` into the settings document.
///
/// Stamps `updatedAt`, notifies every authenticated client with
/// `settings.updated`, and returns the persisted document.
pub struct SaveSettingsHandler;

#[async_trait]
impl MethodHandler for SaveSettingsHandler {
    #[instrument(skip_all, fields(method = "saveSettings", client_id = %session.client_id))]
    async fn handle(
        &self,
        params: Value,
        session: &SessionContext,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let patch = match params.get("settingsPatch") {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(RpcError::invalid_params("settingsPatch must be an object")),
        };
        let keys: Vec<String> = patch.keys().cloned().collect();
        let updated_at = chrono::Utc::now().timestamp_millis();

        let saved = ctx
            .settings
            .update(Box::new(move |mut doc| {
                if let Some(map) = doc.as_object_mut() {
                    map.extend(patch);
                    let _ = map.insert("updatedAt".into(), json!(updated_at));
                }
                doc
            }))
            .await?;
        debug!(keys = ?keys, "settings saved");

        let _ = ctx
            .events
            .publish(
                "settings.updated",
                json!({
                    "by": session.client_id,
                    "updatedAt": updated_at,
                    "keys": keys,
                }),
            )
            .await;
        ctx.audit
            .record("settings.updated", session.actor(), json!({ "keys": keys }))
            .await;

        Ok(saved)
    }
}
