//! In-memory escrow custodian for tests and local deterministic flows.

use crate::escrow::{
    domain::{EscrowReference, EscrowRequest, PayoutTxId},
    ports::{EscrowCustodian, EscrowError, EscrowResult},
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;

/// Custodian operations, used for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscrowOperation {
    /// `create_escrow`.
    Create,
    /// `mark_complete`.
    MarkComplete,
    /// `release_escrow`.
    Release,
    /// `refund_escrow`.
    Refund,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeldFunds {
    Held { completed: bool },
    Released(PayoutTxId),
    Refunded,
}

#[derive(Debug, Clone)]
struct HeldEscrow {
    reference: EscrowReference,
    funds: HeldFunds,
}

#[derive(Debug, Default)]
struct InMemoryCustodianState {
    escrows: HashMap<TaskId, HeldEscrow>,
    calls: HashMap<(EscrowOperation, TaskId), usize>,
    failing: HashSet<EscrowOperation>,
    latency: Option<Duration>,
}

/// In-memory escrow custodian.
///
/// Models the idempotent, task-keyed contract without moving real value.
/// Failures and latency can be injected to exercise retry and timeout paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEscrowCustodian {
    state: Arc<RwLock<InMemoryCustodianState>>,
}

impl InMemoryEscrowCustodian {
    /// Creates an empty custodian.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `operation` fail with an unavailable error.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unavailable`] when lock acquisition fails.
    pub fn fail_next(&self, operation: EscrowOperation) -> EscrowResult<()> {
        self.lock()?.failing.insert(operation);
        Ok(())
    }

    /// Delays every subsequent call by `latency`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unavailable`] when lock acquisition fails.
    pub fn set_latency(&self, latency: Option<Duration>) -> EscrowResult<()> {
        self.lock()?.latency = latency;
        Ok(())
    }

    /// Returns how many times `operation` was invoked for `task_id`.
    ///
    /// Failed invocations are counted.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unavailable`] when lock acquisition fails.
    pub fn call_count(&self, operation: EscrowOperation, task_id: TaskId) -> EscrowResult<usize> {
        Ok(self
            .lock()?
            .calls
            .get(&(operation, task_id))
            .copied()
            .unwrap_or_default())
    }

    /// Returns `true` when the custodian holds unreleased funds for the task.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unavailable`] when lock acquisition fails.
    pub fn is_holding(&self, task_id: TaskId) -> EscrowResult<bool> {
        Ok(self
            .lock()?
            .escrows
            .get(&task_id)
            .is_some_and(|escrow| matches!(escrow.funds, HeldFunds::Held { .. })))
    }

    fn lock(&self) -> EscrowResult<RwLockWriteGuard<'_, InMemoryCustodianState>> {
        self.state
            .write()
            .map_err(|err| EscrowError::unavailable(std::io::Error::other(err.to_string())))
    }

    /// Records the call, applies injected failure, and returns the latency to
    /// simulate.
    fn begin(
        &self,
        operation: EscrowOperation,
        task_id: TaskId,
    ) -> EscrowResult<Option<Duration>> {
        let mut state = self.lock()?;
        *state.calls.entry((operation, task_id)).or_default() += 1;
        if state.failing.remove(&operation) {
            return Err(EscrowError::unavailable(std::io::Error::other(
                "injected custodian failure",
            )));
        }
        Ok(state.latency)
    }

    async fn enter(&self, operation: EscrowOperation, task_id: TaskId) -> EscrowResult<()> {
        if let Some(delay) = self.begin(operation, task_id)? {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl EscrowCustodian for InMemoryEscrowCustodian {
    async fn create_escrow(&self, request: &EscrowRequest) -> EscrowResult<EscrowReference> {
        self.enter(EscrowOperation::Create, request.task_id).await?;
        let mut state = self.lock()?;
        let escrow = state
            .escrows
            .entry(request.task_id)
            .or_insert_with(|| HeldEscrow {
                reference: EscrowReference::new(format!("deposit-{}", request.task_id))
                    .with_contract_address(format!("escrow:{}", request.amount.currency())),
                funds: HeldFunds::Held { completed: false },
            });
        Ok(escrow.reference.clone())
    }

    async fn mark_complete(&self, task_id: TaskId) -> EscrowResult<()> {
        self.enter(EscrowOperation::MarkComplete, task_id).await?;
        let mut state = self.lock()?;
        let escrow = state
            .escrows
            .get_mut(&task_id)
            .ok_or(EscrowError::NotFound(task_id))?;
        if let HeldFunds::Held { completed } = &mut escrow.funds {
            *completed = true;
        }
        Ok(())
    }

    async fn release_escrow(&self, task_id: TaskId) -> EscrowResult<PayoutTxId> {
        self.enter(EscrowOperation::Release, task_id).await?;
        let mut state = self.lock()?;
        let escrow = state
            .escrows
            .get_mut(&task_id)
            .ok_or(EscrowError::NotFound(task_id))?;
        match &escrow.funds {
            HeldFunds::Released(payout_tx) => Ok(payout_tx.clone()),
            HeldFunds::Refunded => Err(EscrowError::Rejected {
                task_id,
                reason: "funds were refunded".to_owned(),
            }),
            HeldFunds::Held { .. } => {
                let payout_tx = PayoutTxId::new(format!("payout-{task_id}"));
                escrow.funds = HeldFunds::Released(payout_tx.clone());
                Ok(payout_tx)
            }
        }
    }

    async fn refund_escrow(&self, task_id: TaskId) -> EscrowResult<()> {
        self.enter(EscrowOperation::Refund, task_id).await?;
        let mut state = self.lock()?;
        let escrow = state
            .escrows
            .get_mut(&task_id)
            .ok_or(EscrowError::NotFound(task_id))?;
        match escrow.funds {
            HeldFunds::Released(_) => Err(EscrowError::Rejected {
                task_id,
                reason: "funds were already released".to_owned(),
            }),
            HeldFunds::Refunded | HeldFunds::Held { .. } => {
                escrow.funds = HeldFunds::Refunded;
                Ok(())
            }
        }
    }
}
