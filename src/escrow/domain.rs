//! Value types exchanged with the escrow custodian.

use crate::task::domain::{Money, PayoutAddress, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Custodian receipt for funds locked against a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowReference {
    transaction_id: String,
    contract_address: Option<String>,
}

impl EscrowReference {
    /// Creates a reference from the deposit transaction identifier.
    #[must_use]
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            contract_address: None,
        }
    }

    /// Sets the address of the contract holding the funds.
    #[must_use]
    pub fn with_contract_address(mut self, contract_address: impl Into<String>) -> Self {
        self.contract_address = Some(contract_address.into());
        self
    }

    /// Returns the deposit transaction identifier.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Returns the contract address, if the custodian reported one.
    #[must_use]
    pub fn contract_address(&self) -> Option<&str> {
        self.contract_address.as_deref()
    }
}

impl fmt::Display for EscrowReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.contract_address {
            Some(address) => write!(f, "{}@{address}", self.transaction_id),
            None => f.write_str(&self.transaction_id),
        }
    }
}

/// Transaction identifier of a released payout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutTxId(String);

impl PayoutTxId {
    /// Wraps a custodian payout transaction identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayoutTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for locking a task budget with the custodian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    /// Task the escrow is keyed by.
    pub task_id: TaskId,
    /// Gross amount to lock.
    pub amount: Money,
    /// Instant after which the requester may reclaim the funds.
    pub deadline: DateTime<Utc>,
    /// Worker address that receives the net payout on release.
    pub beneficiary: PayoutAddress,
}
