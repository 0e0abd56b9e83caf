//! Persisted settings document.
//!
//! The store holds one JSON object. Readers get a snapshot; writers supply a
//! mutator that is applied to the freshly read document and persisted as a
//! single atomic replace, so concurrent `saveSettings` calls never lose each
//! other's keys.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};

/// File name of the persisted settings document inside the data directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Key: whether the remote gateway is enabled (reported by `/meta`).
pub const KEY_GATEWAY_ENABLED: &str = "remoteGatewayEnabled";
/// Key: list of filesystem roots remote clients may read under.
pub const KEY_ALLOWED_ROOTS: &str = "remoteAllowedRoots";
/// Key: currently published remote bundle version.
pub const KEY_BUNDLE_VERSION: &str = "remoteBundleVersion";
/// Key: when the bundle version was last set (epoch millis).
pub const KEY_BUNDLE_UPDATED_AT: &str = "remoteBundleUpdatedAt";

/// Transformation applied to the current document during an update.
pub type SettingsMutator = Box<dyn FnOnce(Value) -> Value + Send>;

/// Read/update access to the persisted settings document.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current document. Always an object.
    async fn read(&self) -> Result<Value>;

    /// Apply `mutator` to the current document and persist the result.
    ///
    /// Returns the persisted document.
    async fn update(&self, mutator: SettingsMutator) -> Result<Value>;
}

/// Settings persisted as a pretty-printed JSON file.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by [`SETTINGS_FILE_NAME`] inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Value> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Value::Object(Map::new()));
            }
            Err(e) => return Err(SettingsError::read(&self.path)(e)),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(v @ Value::Object(_)) => Ok(v),
            Ok(_) => {
                warn!(path = %self.path.display(), "settings root is not an object, treating as empty");
                Ok(Value::Object(Map::new()))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt settings file, treating as empty");
                Ok(Value::Object(Map::new()))
            }
        }
    }

    async fn write_document(&self, doc: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SettingsError::persist(parent))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(SettingsError::persist(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(SettingsError::persist(&self.path))?;
        debug!(path = %self.path.display(), "settings persisted");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn read(&self) -> Result<Value> {
        self.read_document().await
    }

    async fn update(&self, mutator: SettingsMutator) -> Result<Value> {
        let _guard = self.write_lock.lock().await;
        let current = self.read_document().await?;
        let next = mutator(current);
        if !next.is_object() {
            return Err(SettingsError::NotAnObject);
        }
        self.write_document(&next).await?;
        Ok(next)
    }
}

/// Non-persistent store, used by tests and embedders without a data dir.
pub struct InMemorySettingsStore {
    doc: Mutex<Value>,
}

impl InMemorySettingsStore {
    /// Store seeded with `initial` (non-objects become `{}`).
    pub fn new(initial: Value) -> Self {
        let doc = if initial.is_object() {
            initial
        } else {
            Value::Object(Map::new())
        };
        Self {
            doc: Mutex::new(doc),
        }
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn read(&self) -> Result<Value> {
        Ok(self.doc.lock().await.clone())
    }

    async fn update(&self, mutator: SettingsMutator) -> Result<Value> {
        let mut doc = self.doc.lock().await;
        let next = mutator(doc.clone());
        if !next.is_object() {
            return Err(SettingsError::NotAnObject);
        }
        *doc = next.clone();
        Ok(next)
    }
}

// ── Accessors for remote-access keys ────────────────────────────────────────

/// `remoteGatewayEnabled`, defaulting to `false`.
pub fn gateway_enabled(doc: &Value) -> bool {
    doc.get(KEY_GATEWAY_ENABLED)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// `remoteAllowedRoots` as paths. Non-string and empty entries are skipped.
///
/// Returns `None` when the key is absent or not an array, so callers can
/// apply their own fallback.
pub fn allowed_roots(doc: &Value) -> Option<Vec<PathBuf>> {
    let roots = doc.get(KEY_ALLOWED_ROOTS)?.as_array()?;
    Some(
        roots
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect(),
    )
}

/// `remoteBundleVersion`, if set.
pub fn bundle_version(doc: &Value) -> Option<&str> {
    doc.get(KEY_BUNDLE_VERSION).and_then(Value::as_str)
}

/// `remoteBundleUpdatedAt`, if set.
pub fn bundle_updated_at(doc: &Value) -> Option<i64> {
    doc.get(KEY_BUNDLE_UPDATED_AT).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn set(key: &'static str, value: Value) -> SettingsMutator {
        Box::new(move |mut doc| {
            if let Some(map) = doc.as_object_mut() {
                let _ = map.insert(key.to_string(), value);
            }
            doc
        })
    }

    #[tokio::test]
    async fn missing_file_reads_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::in_dir(dir.path());
        assert_eq!(store.read().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn corrupt_file_reads_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::in_dir(dir.path());
        std::fs::write(store.path(), "{{{").unwrap();
        assert_eq!(store.read().await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn update_persists_and_returns_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::in_dir(dir.path());
        let doc = store.update(set("theme", json!("dark"))).await.unwrap();
        assert_eq!(doc["theme"], "dark");

        let reopened = JsonFileSettingsStore::in_dir(dir.path());
        assert_eq!(reopened.read().await.unwrap()["theme"], "dark");
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn update_rejects_non_object_root() {
        let store = InMemorySettingsStore::default();
        let err = store.update(Box::new(|_| json!([1, 2]))).await.unwrap_err();
        assert!(matches!(err, SettingsError::NotAnObject));
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileSettingsStore::in_dir(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("k{i}");
                store
                    .update(Box::new(move |mut doc| {
                        if let Some(map) = doc.as_object_mut() {
                            let _ = map.insert(key, json!(i));
                        }
                        doc
                    }))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let doc = store.read().await.unwrap();
        assert_eq!(doc.as_object().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemorySettingsStore::new(json!({"a": 1}));
        let _ = store.update(set("b", json!(2))).await.unwrap();
        assert_eq!(store.read().await.unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn allowed_roots_accessor() {
        let doc = json!({"remoteAllowedRoots": ["/a", "", 3, "/b"]});
        assert_eq!(
            allowed_roots(&doc).unwrap(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(allowed_roots(&json!({})).is_none());
    }

    #[test]
    fn gateway_enabled_defaults_false() {
        assert!(!gateway_enabled(&json!({})));
        assert!(gateway_enabled(&json!({"remoteGatewayEnabled": true})));
    }

    #[test]
    fn bundle_accessors() {
        let doc = json!({"remoteBundleVersion": "1.2.3", "remoteBundleUpdatedAt": 42});
        assert_eq!(bundle_version(&doc), Some("1.2.3"));
        assert_eq!(bundle_updated_at(&doc), Some(42));
    }
}
