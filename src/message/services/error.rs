//! Service-level errors for the messaging channel.

use crate::external::ExternalServiceError;
use crate::message::error::{MessageDomainError, MessageRepositoryError};
use crate::task::{
    domain::{TaskId, TaskStatus, UserId},
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Errors returned by [`super::MessagingService`] operations.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// No task has the given identifier.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// The caller is not the party it claims to be on this task.
    #[error("user {user} may not {action} on task {task_id}")]
    Forbidden {
        /// Calling user.
        user: UserId,
        /// Task acted upon.
        task_id: TaskId,
        /// Attempted action.
        action: &'static str,
    },

    /// The task has no counterpart to message yet.
    #[error("task {task_id} is {status}; messaging opens once a worker is selected")]
    InvalidState {
        /// Task identifier.
        task_id: TaskId,
        /// Current status.
        status: TaskStatus,
    },

    /// The message or an attachment failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] MessageDomainError),

    /// The blob store failed or timed out.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// The message log failed.
    #[error(transparent)]
    Repository(#[from] MessageRepositoryError),

    /// Reading the task failed.
    #[error(transparent)]
    TaskStore(TaskRepositoryError),
}

impl MessagingError {
    /// Returns `true` when re-issuing the call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalService(_) | Self::Repository(_) | Self::TaskStore(_)
        )
    }
}

impl From<TaskRepositoryError> for MessagingError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::TaskNotFound(task_id) => Self::TaskNotFound(task_id),
            other => Self::TaskStore(other),
        }
    }
}

/// Result type for messaging service operations.
pub type MessagingResult<T> = Result<T, MessagingError>;
