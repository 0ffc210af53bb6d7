//! Channel messages exchanged between requester and selected worker.

use super::{AttachmentRef, MessageId, MessageLimits};
use crate::message::error::MessageDomainError;
use crate::task::domain::{TaskId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Party a message is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    /// The task's requester.
    Requester,
    /// The task's selected worker.
    Worker,
}

impl SenderRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Worker => "worker",
        }
    }

    /// Returns the role on the other side of the channel.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Requester => Self::Worker,
            Self::Worker => Self::Requester,
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown sender role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sender role: {0}")]
pub struct ParseSenderRoleError(pub String);

impl TryFrom<&str> for SenderRole {
    type Error = ParseSenderRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "requester" => Ok(Self::Requester),
            "worker" => Ok(Self::Worker),
            other => Err(ParseSenderRoleError(other.to_owned())),
        }
    }
}

/// Content of a message before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    /// Task the message belongs to.
    pub task_id: TaskId,
    /// Author.
    pub sender_id: UserId,
    /// Role the author writes in.
    pub sender_role: SenderRole,
    /// Body text.
    pub body: String,
    /// Uploaded attachments, in display order.
    pub attachments: Vec<AttachmentRef>,
}

/// A message on a task channel.
///
/// # Invariants
///
/// - The message carries a non-blank body or at least one attachment
/// - Only the read flag changes after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    task_id: TaskId,
    sender_id: UserId,
    sender_role: SenderRole,
    body: String,
    attachments: Vec<AttachmentRef>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Validates a draft against `limits` and stamps it.
    ///
    /// The body is trimmed before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::EmptyMessage`] when there is neither body
    /// text nor an attachment, and the limit errors of [`MessageLimits`].
    pub fn post(
        draft: MessageDraft,
        limits: &MessageLimits,
        clock: &impl Clock,
    ) -> Result<Self, MessageDomainError> {
        let body = draft.body.trim().to_owned();
        if body.is_empty() && draft.attachments.is_empty() {
            return Err(MessageDomainError::EmptyMessage);
        }
        limits.check_body(&body)?;
        limits.check_attachment_count(draft.attachments.len())?;

        Ok(Self {
            id: MessageId::new(),
            task_id: draft.task_id,
            sender_id: draft.sender_id,
            sender_role: draft.sender_role,
            body,
            attachments: draft.attachments,
            read: false,
            created_at: clock.utc(),
        })
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the task the message belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the author.
    #[must_use]
    pub const fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// Returns the role the author wrote in.
    #[must_use]
    pub const fn sender_role(&self) -> SenderRole {
        self.sender_role
    }

    /// Returns the body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the attachment references.
    #[must_use]
    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// Returns `true` once the counterpart has read the message.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sets the read flag, returning `true` if it was unset.
    pub const fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}
