//! Request payloads for channel operations.

use crate::message::domain::SenderRole;
use crate::task::domain::{TaskId, UserId};

/// Raw attachment bytes supplied with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub(super) file_name: String,
    pub(super) content_type: String,
    pub(super) bytes: Vec<u8>,
}

impl AttachmentUpload {
    /// Creates an upload.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Request payload for posting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessageRequest {
    pub(super) task_id: TaskId,
    pub(super) sender_id: UserId,
    pub(super) sender_role: SenderRole,
    pub(super) body: String,
    pub(super) attachments: Vec<AttachmentUpload>,
}

impl PostMessageRequest {
    /// Creates a text message request.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        sender_id: UserId,
        sender_role: SenderRole,
        body: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            sender_id,
            sender_role,
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Appends an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: AttachmentUpload) -> Self {
        self.attachments.push(attachment);
        self
    }
}
