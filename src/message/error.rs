//! Error types for message validation and persistence.
//!
//! Uses `thiserror` for ergonomic error handling with typed variants
//! that can be inspected by callers.

use super::domain::MessageId;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while validating a message or its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageDomainError {
    /// The message has neither body text nor attachments.
    #[error("message must contain text or at least one attachment")]
    EmptyMessage,

    /// The body exceeds the character limit.
    #[error("message body has {actual} characters, exceeds limit of {max}")]
    BodyTooLong {
        /// Body length in characters.
        actual: usize,
        /// Configured limit.
        max: usize,
    },

    /// The message carries too many attachments.
    #[error("message has {actual} attachments, exceeds limit of {max}")]
    TooManyAttachments {
        /// Attachment count.
        actual: usize,
        /// Configured limit.
        max: usize,
    },

    /// An attachment exceeds the size limit.
    #[error("attachment {file_name} is {size_bytes} bytes, exceeds limit of {max_bytes}")]
    AttachmentTooLarge {
        /// Offending file.
        file_name: String,
        /// Its size.
        size_bytes: usize,
        /// Configured limit.
        max_bytes: usize,
    },

    /// An attachment has no content.
    #[error("attachment {0} is empty")]
    EmptyAttachment(String),

    /// An attachment descriptor is malformed.
    #[error("invalid attachment: {0}")]
    InvalidAttachment(String),
}

/// Errors returned by message repository implementations.
#[derive(Debug, Clone, Error)]
pub enum MessageRepositoryError {
    /// A message with the same identifier already exists.
    #[error("duplicate message identifier: {0}")]
    DuplicateMessage(MessageId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl MessageRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
