//! Attachment references and message size limits.

use crate::message::error::MessageDomainError;
use serde::{Deserialize, Serialize};

/// Pointer to attachment bytes held by the blob store.
///
/// # Examples
///
/// ```
/// use gigflow::message::domain::AttachmentRef;
///
/// let attachment = AttachmentRef::new("blob://1/report.pdf", "report.pdf", "application/pdf", 2048)
///     .expect("valid attachment");
/// assert_eq!(attachment.size_bytes(), 2048);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    url: String,
    file_name: String,
    content_type: String,
    size_bytes: u64,
}

impl AttachmentRef {
    /// Creates a reference to uploaded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidAttachment`] when the URL, file
    /// name, or content type is blank.
    pub fn new(
        url: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<Self, MessageDomainError> {
        let attachment = Self {
            url: url.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes,
        };
        if attachment.url.trim().is_empty() {
            return Err(MessageDomainError::InvalidAttachment(
                "blob URL is required".to_owned(),
            ));
        }
        check_descriptor(&attachment.file_name, &attachment.content_type)?;
        Ok(attachment)
    }

    /// Returns the blob store URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Size limits enforced when a message is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    /// Maximum body length in characters.
    pub max_body_chars: usize,
    /// Maximum attachments per message.
    pub max_attachments: usize,
    /// Maximum size of one attachment in bytes.
    pub max_attachment_bytes: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_body_chars: 4_000,
            max_attachments: 10,
            max_attachment_bytes: 10 * 1024 * 1024,
        }
    }
}

impl MessageLimits {
    /// Checks the body length.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::BodyTooLong`] above the character limit.
    pub fn check_body(&self, body: &str) -> Result<(), MessageDomainError> {
        let actual = body.chars().count();
        if actual > self.max_body_chars {
            return Err(MessageDomainError::BodyTooLong {
                actual,
                max: self.max_body_chars,
            });
        }
        Ok(())
    }

    /// Checks the number of attachments.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::TooManyAttachments`] above the limit.
    pub const fn check_attachment_count(&self, actual: usize) -> Result<(), MessageDomainError> {
        if actual > self.max_attachments {
            return Err(MessageDomainError::TooManyAttachments {
                actual,
                max: self.max_attachments,
            });
        }
        Ok(())
    }

    /// Checks one attachment before its bytes are uploaded.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidAttachment`] for a blank file name
    /// or content type, [`MessageDomainError::EmptyAttachment`] for zero bytes,
    /// and [`MessageDomainError::AttachmentTooLarge`] above the size limit.
    pub fn check_attachment(
        &self,
        file_name: &str,
        content_type: &str,
        size_bytes: usize,
    ) -> Result<(), MessageDomainError> {
        check_descriptor(file_name, content_type)?;
        if size_bytes == 0 {
            return Err(MessageDomainError::EmptyAttachment(file_name.to_owned()));
        }
        if size_bytes > self.max_attachment_bytes {
            return Err(MessageDomainError::AttachmentTooLarge {
                file_name: file_name.to_owned(),
                size_bytes,
                max_bytes: self.max_attachment_bytes,
            });
        }
        Ok(())
    }
}

fn check_descriptor(file_name: &str, content_type: &str) -> Result<(), MessageDomainError> {
    if file_name.trim().is_empty() {
        return Err(MessageDomainError::InvalidAttachment(
            "file name is required".to_owned(),
        ));
    }
    if content_type.trim().is_empty() {
        return Err(MessageDomainError::InvalidAttachment(format!(
            "content type is required for {file_name}"
        )));
    }
    Ok(())
}
