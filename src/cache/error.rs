//! Cache error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to persist cache entry {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Persist {
            path: path.into(),
            source,
        }
    }
}
