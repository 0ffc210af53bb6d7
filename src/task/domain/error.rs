//! Error types for task domain validation and parsing.

use super::{ApplicationId, ApplicationStatus, TaskId, TaskStatus, UserId};
use thiserror::Error;

/// Errors returned while constructing or mutating task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task description is empty after trimming.
    #[error("task description must not be empty")]
    EmptyDescription,

    /// A user identifier is empty after trimming.
    #[error("user identifier must not be empty")]
    EmptyUserId,

    /// The budget must be strictly positive.
    #[error("task budget must be greater than zero")]
    NonPositiveBudget,

    /// The deadline is not after the creation instant.
    #[error("task deadline must be in the future")]
    DeadlineNotInFuture,

    /// The currency code is malformed.
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),

    /// The commission rate exceeds 100 percent.
    #[error("invalid commission percentage {0}, expected 0..=100")]
    InvalidCommissionPercent(u8),

    /// The payout address is malformed.
    #[error("invalid payout address '{0}'")]
    InvalidPayoutAddress(String),

    /// No payout address was supplied or bound for the selected worker.
    #[error("task {0} has no worker payout address bound")]
    MissingPayoutAddress(TaskId),

    /// The requested task transition is not permitted.
    #[error("task {task_id} cannot transition from {from} to {to}")]
    InvalidStateTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current lifecycle status.
        from: TaskStatus,
        /// Requested lifecycle status.
        to: TaskStatus,
    },

    /// The operation is not available in the task's current status.
    #[error("task {task_id} in status {status} does not allow {operation}")]
    OperationNotAllowed {
        /// Task identifier.
        task_id: TaskId,
        /// Current lifecycle status.
        status: TaskStatus,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// The escrow is not in the state the operation needs.
    #[error("task {task_id} escrow is {actual}, operation requires {required}")]
    EscrowStateMismatch {
        /// Task identifier.
        task_id: TaskId,
        /// Escrow state the operation needs.
        required: &'static str,
        /// Escrow state observed on the task.
        actual: &'static str,
    },

    /// The worker already holds a pending application on the task.
    #[error("worker {worker} already has a pending application on task {task_id}")]
    AlreadyApplied {
        /// Task identifier.
        task_id: TaskId,
        /// Applying worker.
        worker: UserId,
    },

    /// The requested application transition is not permitted.
    #[error("application {application_id} cannot transition from {from} to {to}")]
    InvalidApplicationTransition {
        /// Application identifier.
        application_id: ApplicationId,
        /// Current application status.
        from: ApplicationStatus,
        /// Requested application status.
        to: ApplicationStatus,
    },
}

impl TaskDomainError {
    /// Returns `true` when the error reflects lifecycle state rather than
    /// malformed input.
    #[must_use]
    pub const fn is_state_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. }
                | Self::OperationNotAllowed { .. }
                | Self::EscrowStateMismatch { .. }
                | Self::AlreadyApplied { .. }
                | Self::InvalidApplicationTransition { .. }
        )
    }
}

/// Error returned while parsing lifecycle statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);
