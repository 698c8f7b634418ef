// Error types module

use thiserror::Error;

use crate::cache::CacheError;
use crate::transform::ImageError;

/// Error returned by the request pipeline
///
/// Every failure a request can hit collapses into one of three kinds, each
/// with a fixed HTTP status. The transport matches on this enum in exactly
/// one place (`to_http_status`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Source image does not exist (404)
    #[error("File not found: {identifier}")]
    FileNotFound { identifier: String },

    /// Invalid or out-of-range request parameter (400)
    #[error("{message}")]
    BadRequest { message: String },

    /// Codec or filesystem failure (500)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    pub fn file_not_found(identifier: impl Into<String>) -> Self {
        PipelineError::FileNotFound {
            identifier: identifier.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        PipelineError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal {
            message: message.into(),
        }
    }

    /// Maps pipeline errors to HTTP status codes
    pub fn to_http_status(&self) -> u16 {
        match self {
            PipelineError::FileNotFound { .. } => 404,
            PipelineError::BadRequest { .. } => 400,
            PipelineError::Internal { .. } => 500,
        }
    }
}

impl From<CacheError> for PipelineError {
    fn from(err: CacheError) -> Self {
        PipelineError::internal(err.to_string())
    }
}

impl From<ImageError> for PipelineError {
    fn from(err: ImageError) -> Self {
        PipelineError::internal(err.to_string())
    }
}
