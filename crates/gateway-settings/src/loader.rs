//! Gateway config loading with deep merge and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If the config file exists, deep-merge its values over defaults
//! 3. Apply `GATEWAY_*` environment variable overrides
//!
//! Command-line flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::GatewaySettings;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "gateway.json";

/// `~/.remote-gateway`, or `/tmp/.remote-gateway` without `HOME`.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".remote-gateway")
}

/// Config file location for a data directory.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

/// Resolve a configured data dir string. Empty means [`default_data_dir`];
/// a leading `~/` expands to `HOME`.
pub fn resolve_data_dir(configured: &str) -> PathBuf {
    if configured.is_empty() {
        return default_data_dir();
    }
    if let Some(rest) = configured.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(configured)
}

/// Load the config for a data directory with env var overrides.
pub fn load_settings(data_dir: &Path) -> Result<GatewaySettings> {
    load_settings_from_path(&config_path(data_dir))
}

/// Load the config from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatewaySettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<GatewaySettings> {
    let defaults = serde_json::to_value(GatewaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading gateway config from file");
        let content = std::fs::read_to_string(path).map_err(SettingsError::read(path))?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "gateway config not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `GATEWAY_*` process environment overrides.
pub fn apply_env_overrides(settings: &mut GatewaySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides<F>(settings: &mut GatewaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let invalid = |name: &str, value: &str| {
        warn!(key = name, value, "invalid env override, ignoring");
    };

    if let Some(v) = read("GATEWAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("GATEWAY_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => settings.server.port = port,
            None => invalid("GATEWAY_PORT", &v),
        }
    }
    if let Some(v) = read("GATEWAY_TOKEN") {
        settings.server.token = v;
    }
    if let Some(v) = read("GATEWAY_MAX_PAYLOAD_BYTES") {
        match parse_usize_range(&v, 1, 256 * 1024 * 1024) {
            Some(n) => settings.server.max_payload_bytes = n,
            None => invalid("GATEWAY_MAX_PAYLOAD_BYTES", &v),
        }
    }
    if let Some(v) = read("GATEWAY_MAX_CONCURRENT_RPC") {
        match parse_usize_range(&v, 1, 10_000) {
            Some(n) => settings.server.max_concurrent_rpc_per_client = n,
            None => invalid("GATEWAY_MAX_CONCURRENT_RPC", &v),
        }
    }
    if let Some(v) = read("GATEWAY_HEARTBEAT_INTERVAL_MS") {
        match parse_u64_range(&v, 10, 3_600_000) {
            Some(n) => settings.server.heartbeat_interval_ms = n,
            None => invalid("GATEWAY_HEARTBEAT_INTERVAL_MS", &v),
        }
    }
    if let Some(v) = read("GATEWAY_DATA_DIR") {
        settings.server.data_dir = v;
    }
    if let Some(v) = read("GATEWAY_ROLE_ENFORCEMENT") {
        match serde_json::from_value(Value::String(v.to_lowercase())) {
            Ok(mode) => settings.server.role_enforcement = mode,
            Err(_) => invalid("GATEWAY_ROLE_ENFORCEMENT", &v),
        }
    }
    if let Some(v) = read("GATEWAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("GATEWAY_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => invalid("GATEWAY_LOG_JSON", &v),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
