//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure loading the gateway config or persisting the settings document.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A config or settings file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The settings document could not be written back.
    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Malformed JSON, or JSON that does not fit the config schema.
    #[error("malformed settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// An update produced something other than a JSON object.
    #[error("settings document must be a JSON object")]
    NotAnObject,
}

impl SettingsError {
    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Persist { path, source }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
