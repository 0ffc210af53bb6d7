//! Blob store port for attachment bytes.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Opaque remote storage for attachment bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` and returns a URL that resolves to them.
    async fn upload(&self, file_name: &str, content_type: &str, bytes: &[u8])
    -> BlobResult<String>;
}

/// Errors reported by blob store adapters.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    /// The store refused the upload.
    #[error("upload of {file_name} rejected: {reason}")]
    Rejected {
        /// File that was uploaded.
        file_name: String,
        /// Store-supplied reason.
        reason: String,
    },

    /// The store could not be reached or failed internally.
    #[error("blob store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl BlobError {
    /// Wraps a transport or runtime failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
