//! Notification records handed to the sink.

use crate::task::domain::{TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role in which a notification recipient is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    /// The user who posted the task.
    Requester,
    /// A worker, applicant or selected.
    Worker,
    /// Platform staff observing new postings.
    Administrator,
}

impl RecipientRole {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Worker => "worker",
            Self::Administrator => "administrator",
        }
    }
}

impl fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fire-and-forget event record for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Addressee.
    pub recipient_id: UserId,
    /// Role the addressee is notified in.
    pub recipient_role: RecipientRole,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Task the event concerns, if any.
    pub related_task_id: Option<TaskId>,
}

impl Notification {
    /// Creates a notification about a task.
    #[must_use]
    pub fn about_task(
        task_id: TaskId,
        recipient_id: UserId,
        recipient_role: RecipientRole,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id,
            recipient_role,
            title: title.into(),
            body: body.into(),
            related_task_id: Some(task_id),
        }
    }
}
