//! Cache key derivation
//!
//! A cache key is the SHA-256 of the transformation's full parameter tuple,
//! hex-encoded. The field order and separator below are a stable contract:
//! changing either orphans every existing cache entry.
//!
//! ```text
//! sha256("{height}:{width}:{source_id}:{filter}:{method}:{anchor}")
//! ```
//!
//! Integers never contain `:` and the source identifier is the only
//! free-text field, with a fixed number of integer fields on either side,
//! so distinct tuples always hash distinct inputs.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::transform::TransformRequest;

const SEPARATOR: &[u8] = b":";

/// Hex-encoded SHA-256 identifying one transformation of one source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a validated request
    pub fn for_request(request: &TransformRequest) -> Self {
        derive_key(
            request.source_id(),
            request.method().code(),
            i64::from(request.height()),
            i64::from(request.width()),
            request.anchor().code(),
            request.filter().code(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache file name: the key followed by the source extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}{}", self.0, extension)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a parameter tuple
pub fn derive_key(
    source_id: &str,
    method: i64,
    height: i64,
    width: i64,
    anchor: i64,
    filter: i64,
) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(height.to_string().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(width.to_string().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(source_id.as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(filter.to_string().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(method.to_string().as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(anchor.to_string().as_bytes());
    CacheKey(hex::encode(hasher.finalize()))
}

/// Extension of the source identifier including the leading dot
///
/// Returns an empty string when the identifier has no extension.
pub fn source_extension(source_id: &str) -> String {
    Path::new(source_id)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
