//! Escrow custodian port.
//!
//! The custodian is an at-least-once remote service. Every operation is keyed
//! by task identifier and idempotent: repeating a call for the same task
//! returns the original outcome instead of moving funds twice.

use super::domain::{EscrowReference, EscrowRequest, PayoutTxId};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for custodian operations.
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Remote value-custody contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EscrowCustodian: Send + Sync {
    /// Locks the task budget and returns the deposit receipt.
    ///
    /// A repeated call for a task that is already funded returns the existing
    /// receipt.
    async fn create_escrow(&self, request: &EscrowRequest) -> EscrowResult<EscrowReference>;

    /// Informs the custodian that the worker reported completion.
    async fn mark_complete(&self, task_id: TaskId) -> EscrowResult<()>;

    /// Pays the held funds out and returns the payout transaction.
    async fn release_escrow(&self, task_id: TaskId) -> EscrowResult<PayoutTxId>;

    /// Returns the held funds to the requester.
    async fn refund_escrow(&self, task_id: TaskId) -> EscrowResult<()>;
}

/// Errors reported by custodian adapters.
#[derive(Debug, Clone, Error)]
pub enum EscrowError {
    /// No escrow exists for the task.
    #[error("no escrow held for task {0}")]
    NotFound(TaskId),

    /// The custodian refused the operation.
    #[error("custodian rejected operation for task {task_id}: {reason}")]
    Rejected {
        /// Task identifier.
        task_id: TaskId,
        /// Custodian-supplied reason.
        reason: String,
    },

    /// The custodian could not be reached or failed internally.
    #[error("custodian unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl EscrowError {
    /// Wraps a transport or runtime failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
