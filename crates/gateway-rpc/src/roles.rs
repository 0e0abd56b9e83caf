//! Advisory roles.
//!
//! A client may present a role at auth time. Every method declares the role
//! it expects. Whether a mismatch blocks the call is decided by the
//! [`RoleGate`] installed in the registry.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gateway_settings::RoleEnforcement;

use crate::errors::RpcError;

/// Access level, ordered from least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// No requirement.
    None,
    /// Read-only access.
    Viewer,
    /// May change settings and publish versions.
    Operator,
    /// May touch the host filesystem.
    Admin,
}

impl Role {
    /// Parse a presented role label (case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "viewer" => Some(Self::Viewer),
            "operator" => Some(Self::Operator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Viewer => "viewer",
            Self::Operator => "operator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a session may call a method.
pub trait RoleGate: Send + Sync {
    /// `presented` is the session's role label as sent at auth, if any.
    fn check(&self, presented: Option<&str>, required: Role, method: &str) -> Result<(), RpcError>;
}

/// Never blocks. Roles are carried for audit only.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdvisoryRoleGate;

impl RoleGate for AdvisoryRoleGate {
    fn check(&self, _presented: Option<&str>, _required: Role, _method: &str) -> Result<(), RpcError> {
        Ok(())
    }
}

/// Blocks calls whose presented role ranks below the requirement.
///
/// Unknown or missing labels rank as [`Role::None`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictRoleGate;

impl RoleGate for StrictRoleGate {
    fn check(&self, presented: Option<&str>, required: Role, method: &str) -> Result<(), RpcError> {
        let actual = presented.and_then(Role::parse).unwrap_or(Role::None);
        if actual >= required {
            Ok(())
        } else {
            Err(RpcError::PermissionDenied {
                message: format!("Method {method} requires role {required}, session has {actual}"),
            })
        }
    }
}

/// Gate for a configured enforcement mode.
pub fn gate_for(mode: RoleEnforcement) -> Arc<dyn RoleGate> {
    match mode {
        RoleEnforcement::Advisory => Arc::new(AdvisoryRoleGate),
        RoleEnforcement::Enforced => Arc::new(StrictRoleGate),
    }
}
