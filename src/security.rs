//! Source path containment
//!
//! Source identifiers come straight from the query string and are joined
//! onto the image root. Anything that could name a file outside that root
//! is rejected before the filesystem is touched:
//! - ../ and ..\ components (raw or URL-encoded)
//! - Absolute paths (/etc/passwd, C:\Windows)
//! - Null bytes (path truncation)
//!
//! Symlinks are caught afterwards by comparing canonical paths.

use std::path::{Component, Path, PathBuf};

use crate::error::PipelineError;

/// Security validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Path traversal attempt detected (400)
    PathTraversal { path: String },
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::PathTraversal { path } => {
                write!(f, "Path traversal attempt detected: {}", path)
            }
        }
    }
}

impl std::error::Error for SecurityError {}

/// Check a relative identifier for path traversal attempts
pub fn check_path_traversal(path: &str) -> Result<(), SecurityError> {
    let traversal = || SecurityError::PathTraversal {
        path: path.to_string(),
    };
    let path_lower = path.to_lowercase();

    if path_lower.contains("..\\")
        || path_lower.contains("%2e%2e%2f")  // URL-encoded ../
        || path_lower.contains("%2e%2e%5c")  // URL-encoded ..\
        || path_lower.contains("%2e%2e/")
        || path_lower.contains("%2e%2e\\")
    {
        return Err(traversal());
    }

    if path.contains('\0') {
        return Err(traversal());
    }

    // Windows drive and UNC prefixes are not absolute on unix
    if path.starts_with('/') || path.starts_with('\\') || path.get(1..2) == Some(":") {
        return Err(traversal());
    }

    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal());
            }
        }
    }

    Ok(())
}

/// Resolve `source_id` to an existing regular file under `root`
///
/// Empty identifiers and missing files are `FileNotFound`; identifiers
/// that would escape `root` are `BadRequest`.
pub fn resolve_source_path(root: &Path, source_id: &str) -> Result<PathBuf, PipelineError> {
    if source_id.is_empty() {
        return Err(PipelineError::file_not_found(source_id));
    }

    if let Err(e) = check_path_traversal(source_id) {
        tracing::warn!(source_id = %source_id, error = %e, "Rejected source identifier");
        return Err(PipelineError::bad_request(format!(
            "Invalid file name: {}",
            source_id
        )));
    }

    let canonical_root = canonicalize(root, source_id)?;
    let candidate = canonicalize(&root.join(source_id), source_id)?;

    if !candidate.starts_with(&canonical_root) {
        tracing::warn!(
            source_id = %source_id,
            resolved = %candidate.display(),
            "Source identifier resolves outside the image directory"
        );
        return Err(PipelineError::bad_request(format!(
            "Invalid file name: {}",
            source_id
        )));
    }

    if !candidate.is_file() {
        return Err(PipelineError::file_not_found(source_id));
    }

    Ok(candidate)
}

fn canonicalize(path: &Path, source_id: &str) -> Result<PathBuf, PipelineError> {
    path.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::file_not_found(source_id),
        _ => PipelineError::internal(format!(
            "Failed to resolve {}: {}",
            path.display(),
            e
        )),
    })
}
