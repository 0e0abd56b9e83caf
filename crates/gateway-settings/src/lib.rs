//! # gateway-settings
//!
//! Two kinds of configuration live here:
//!
//! 1. **Gateway config** ([`GatewaySettings`]): how the process runs. Loaded
//!    from compiled defaults, deep-merged with `<dataDir>/gateway.json`, then
//!    overridden by `GATEWAY_*` environment variables.
//! 2. **Persisted settings** ([`SettingsStore`]): the free-form JSON document
//!    that remote clients read and patch over RPC (`loadSettings` /
//!    `saveSettings`), and that carries the remote-access keys such as
//!    `remoteAllowedRoots`.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod store;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    config_path, deep_merge, default_data_dir, load_settings, load_settings_from_path,
    resolve_data_dir,
};
pub use store::{InMemorySettingsStore, JsonFileSettingsStore, SettingsMutator, SettingsStore};
pub use types::{GatewaySettings, LoggingSettings, RoleEnforcement, ServerSettings};
