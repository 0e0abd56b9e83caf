//! RPC error codes, handler errors, and protocol errors.

use gateway_core::sandbox::SandboxError;
use gateway_settings::SettingsError;

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error, including handler panics.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Per-connection in-flight limit reached.
pub const CONCURRENCY_LIMIT: &str = "CONCURRENCY_LIMIT";
/// Path outside every allowed root.
pub const PATH_NOT_ALLOWED: &str = "PATH_NOT_ALLOWED";
/// Generic not-found.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Session role below the method requirement (strict gate only).
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
/// Resource or feature not available.
pub const NOT_AVAILABLE: &str = "NOT_AVAILABLE";
/// Filesystem failure other than not-found.
pub const FILE_ERROR: &str = "FILE_ERROR";
/// Settings store failure.
pub const SETTINGS_ERROR: &str = "SETTINGS_ERROR";

/// Error type returned by method handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Requested resource not found.
    #[error("{message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Target path rejected by the sandbox.
    #[error("Path not allowed: {path}")]
    PathNotAllowed {
        /// The path as the client supplied it.
        path: String,
    },

    /// Role gate refused the call.
    #[error("{message}")]
    PermissionDenied {
        /// Description.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },

    /// Feature or resource not available.
    #[error("{message}")]
    NotAvailable {
        /// Description.
        message: String,
    },

    /// Domain-specific error with arbitrary code.
    #[error("{message}")]
    Custom {
        /// Machine-readable code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::NotFound { .. } => NOT_FOUND,
            Self::PathNotAllowed { .. } => PATH_NOT_ALLOWED,
            Self::PermissionDenied { .. } => PERMISSION_DENIED,
            Self::Internal { .. } => INTERNAL_ERROR,
            Self::NotAvailable { .. } => NOT_AVAILABLE,
            Self::Custom { code, .. } => code,
        }
    }

    /// Shorthand for [`RpcError::InvalidParams`].
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Map an I/O failure on `path` to a handler error.
    pub fn from_io(err: &std::io::Error, path: &str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                message: format!("File not found: {path}"),
            }
        } else {
            Self::Custom {
                code: FILE_ERROR.into(),
                message: err.to_string(),
            }
        }
    }
}

impl From<SandboxError> for RpcError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::PathNotAllowed { path } => Self::PathNotAllowed { path },
        }
    }
}

impl From<SettingsError> for RpcError {
    fn from(err: SettingsError) -> Self {
        Self::Custom {
            code: SETTINGS_ERROR.into(),
            message: err.to_string(),
        }
    }
}

/// Connection-level protocol violations, reported as `error` envelopes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame exceeds the configured cap.
    #[error("Payload too large. Max {max} bytes")]
    PayloadTooLarge {
        /// Configured cap in bytes.
        max: usize,
    },

    /// Frame is not a valid envelope.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Non-auth message on an unauthenticated session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Envelope `type` not understood.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),
}
