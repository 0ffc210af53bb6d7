//! Service-level error taxonomy for the task lifecycle engine.

use crate::external::ExternalServiceError;
use crate::task::{
    domain::{ApplicationId, TaskDomainError, TaskId, UserId},
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Errors returned by [`super::TaskLifecycleService`] operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// No task has the given identifier.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// No application has the given identifier on the task.
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),

    /// The caller is not allowed to act on the task.
    #[error("user {user} may not {action} on task {task_id}")]
    Forbidden {
        /// Calling user.
        user: UserId,
        /// Task acted upon.
        task_id: TaskId,
        /// Attempted action.
        action: &'static str,
    },

    /// The operation is illegal for the task's current state.
    #[error("invalid state: {0}")]
    InvalidState(TaskDomainError),

    /// A concurrent writer changed the task or application first.
    #[error("concurrent update lost: {0}")]
    Conflict(TaskRepositoryError),

    /// A remote collaborator failed or timed out.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(TaskDomainError),

    /// The record store failed.
    #[error(transparent)]
    Repository(TaskRepositoryError),
}

impl TaskLifecycleError {
    /// Returns `true` when re-issuing the call may succeed.
    ///
    /// Conflicts require the caller to re-read state first; external failures
    /// leave persisted state unchanged and can be retried as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::ExternalService(_) | Self::Repository(_)
        )
    }
}

impl From<TaskDomainError> for TaskLifecycleError {
    fn from(err: TaskDomainError) -> Self {
        if err.is_state_violation() {
            Self::InvalidState(err)
        } else {
            Self::Validation(err)
        }
    }
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::TaskNotFound(task_id) => Self::TaskNotFound(task_id),
            TaskRepositoryError::ApplicationNotFound(application_id) => {
                Self::ApplicationNotFound(application_id)
            }
            TaskRepositoryError::Conflict { .. } | TaskRepositoryError::ApplicationConflict { .. } => {
                Self::Conflict(err)
            }
            other => Self::Repository(other),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;
