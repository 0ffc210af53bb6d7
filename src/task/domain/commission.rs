//! Accounting entry for the platform's cut of an approved task.

use super::{EscrowStatus, Money, Task, TaskDomainError, TaskId, TaskStatus};
use crate::escrow::domain::{EscrowReference, PayoutTxId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Commission record written once per approved task.
///
/// # Invariants
///
/// - `commission + net == gross`
/// - all three amounts share the task currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRecord {
    task_id: TaskId,
    gross: Money,
    commission: Money,
    net: Money,
    escrow_reference: EscrowReference,
    payout_tx: PayoutTxId,
    created_at: DateTime<Utc>,
}

impl CommissionRecord {
    /// Builds the record for a task whose escrow has been released.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::OperationNotAllowed`] unless the task is
    /// approved, or [`TaskDomainError::EscrowStateMismatch`] when the escrow
    /// was not released.
    pub fn for_approved_task(task: &Task, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        if task.status() != TaskStatus::Approved {
            return Err(TaskDomainError::OperationNotAllowed {
                task_id: task.id(),
                status: task.status(),
                operation: "record commission",
            });
        }
        let EscrowStatus::Released {
            reference,
            payout_tx,
        } = task.escrow()
        else {
            return Err(TaskDomainError::EscrowStateMismatch {
                task_id: task.id(),
                required: "released",
                actual: task.escrow().label(),
            });
        };

        let split = task.commission_split();
        Ok(Self {
            task_id: task.id(),
            gross: split.gross().clone(),
            commission: split.commission().clone(),
            net: split.net().clone(),
            escrow_reference: reference.clone(),
            payout_tx: payout_tx.clone(),
            created_at: clock.utc(),
        })
    }

    /// Returns the task the record settles.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the gross task budget.
    #[must_use]
    pub const fn gross(&self) -> &Money {
        &self.gross
    }

    /// Returns the platform commission.
    #[must_use]
    pub const fn commission(&self) -> &Money {
        &self.commission
    }

    /// Returns the worker's net payout.
    #[must_use]
    pub const fn net(&self) -> &Money {
        &self.net
    }

    /// Returns the escrow deposit that funded the payout.
    #[must_use]
    pub const fn escrow_reference(&self) -> &EscrowReference {
        &self.escrow_reference
    }

    /// Returns the payout transaction.
    #[must_use]
    pub const fn payout_tx(&self) -> &PayoutTxId {
        &self.payout_tx
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
