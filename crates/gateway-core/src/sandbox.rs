//! Path sandbox.
//!
//! Every filesystem access requested by a remote client is checked here
//! before it happens. A target is permitted only when its normalized form
//! equals an allowed root or lies strictly beneath one. Normalization is
//! purely lexical: `.` and `..` segments are collapsed without touching the
//! filesystem, so a path that does not exist can still be checked.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Sandbox check failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// The normalized target lies outside every allowed root.
    #[error("Path not allowed: {path}")]
    PathNotAllowed {
        /// The target as the caller supplied it.
        path: String,
    },
}

/// Resolve `path` to an absolute, lexically normalized path.
///
/// Relative paths are resolved against the process working directory.
/// `..` never climbs above the filesystem root.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// Check `target` against `allowed_roots`.
///
/// Returns the normalized target on success. Prefix matching is done per
/// path component, so `/root` does not admit `/root2`. An empty root list
/// admits nothing.
pub fn ensure_allowed<R: AsRef<Path>>(
    target: impl AsRef<Path>,
    allowed_roots: &[R],
) -> Result<PathBuf, SandboxError> {
    let target = target.as_ref();
    let resolved = normalize(target);
    let permitted = allowed_roots
        .iter()
        .map(|root| normalize(root))
        .any(|root| resolved.starts_with(&root));

    if permitted {
        Ok(resolved)
    } else {
        Err(SandboxError::PathNotAllowed {
            path: target.display().to_string(),
        })
    }
}
