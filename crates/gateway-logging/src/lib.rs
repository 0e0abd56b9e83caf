//! # gateway-logging
//!
//! One-call `tracing` setup. `RUST_LOG` wins over the configured level when
//! set. Output is either human-readable or JSON lines.

#![deny(unsafe_code)]

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Default log level.
    pub level: Level,
    /// Per-module overrides, e.g. `("gateway_server", DEBUG)`.
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Build from a level name. Unknown names fall back to `info`.
    pub fn from_level_name(level: &str, json: bool) -> Self {
        Self {
            level: parse_level(level).unwrap_or(Level::INFO),
            module_levels: Vec::new(),
            json,
        }
    }
}

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`).
pub fn parse_level(name: &str) -> Option<Level> {
    Level::from_str(name.trim()).ok()
}

/// Filter directive string for `config`, e.g. `info,gateway_rpc=debug`.
pub fn filter_directive(config: &LoggingConfig) -> String {
    let mut directive = config.level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        directive.push(',');
        directive.push_str(module);
        directive.push('=');
        directive.push_str(&level.to_string().to_lowercase());
    }
    directive
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, which makes
/// repeated calls (e.g. from tests) harmless.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
