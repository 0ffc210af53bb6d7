//! Task aggregate root and its lifecycle state machine.

use super::{
    ApplicationId, CommissionPercent, CommissionSplit, Money, ParseStatusError, PayoutAddress,
    TaskDomainError, TaskId, UserId,
};
use crate::escrow::domain::{EscrowReference, PayoutTxId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Posted and accepting applications.
    Open,
    /// A worker has been selected.
    Accepted,
    /// The selected worker has started work on funded escrow.
    InProgress,
    /// The worker reports the work as done.
    Completed,
    /// The requester accepted the work and the payout was released.
    Approved,
    /// The completed work is contested.
    Disputed,
    /// Administratively closed.
    Closed,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::Accepted,
        Self::InProgress,
        Self::Completed,
        Self::Approved,
        Self::Disputed,
        Self::Closed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Approved => "approved",
            Self::Disputed => "disputed",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Closed)
    }

    /// Returns `true` for statuses in which a worker must be selected.
    #[must_use]
    pub const fn requires_selected_worker(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::InProgress | Self::Completed | Self::Approved | Self::Disputed
        )
    }

    /// Returns `true` when the lifecycle permits moving to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Accepted | Self::Closed)
                | (
                    Self::Accepted,
                    Self::InProgress | Self::Completed | Self::Closed
                )
                | (Self::InProgress, Self::Completed | Self::Closed)
                | (
                    Self::Completed,
                    Self::Approved | Self::Disputed | Self::Closed
                )
                | (Self::Disputed, Self::Closed)
        )
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(value.to_owned()))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive part of a task posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListing {
    title: String,
    description: String,
    category: Option<String>,
    tags: BTreeSet<String>,
    required_skills: BTreeSet<String>,
}

impl TaskListing {
    /// Creates a listing with trimmed title and description.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] or
    /// [`TaskDomainError::EmptyDescription`] when either is blank.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, TaskDomainError> {
        let title_text = title.into().trim().to_owned();
        if title_text.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let description_text = description.into().trim().to_owned();
        if description_text.is_empty() {
            return Err(TaskDomainError::EmptyDescription);
        }
        Ok(Self {
            title: title_text,
            description: description_text,
            category: None,
            tags: BTreeSet::new(),
            required_skills: BTreeSet::new(),
        })
    }

    /// Sets the category; blank values clear it.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let value = category.into().trim().to_owned();
        self.category = (!value.is_empty()).then_some(value);
        self
    }

    /// Sets the tag set.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = normalize_labels(tags);
        self
    }

    /// Sets the required skill set.
    #[must_use]
    pub fn with_required_skills(mut self, skills: impl IntoIterator<Item = String>) -> Self {
        self.required_skills = normalize_labels(skills);
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the category, if any.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns the tag set.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the required skill set.
    #[must_use]
    pub const fn required_skills(&self) -> &BTreeSet<String> {
        &self.required_skills
    }
}

fn normalize_labels(labels: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    labels
        .into_iter()
        .map(|label| label.trim().to_owned())
        .filter(|label| !label.is_empty())
        .collect()
}

/// The worker chosen for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedWorker {
    /// Application that won the selection.
    pub application_id: ApplicationId,
    /// Worker identifier.
    pub worker_id: UserId,
    /// Worker display name.
    pub worker_name: String,
}

/// Escrow lifecycle as recorded on the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EscrowStatus {
    /// No funds have been locked.
    NotDeposited,
    /// Funds are held by the custodian.
    Deposited {
        /// Custodian deposit receipt.
        reference: EscrowReference,
    },
    /// Funds were paid out to the worker.
    Released {
        /// Custodian deposit receipt.
        reference: EscrowReference,
        /// Payout transaction.
        payout_tx: PayoutTxId,
    },
    /// Funds were returned to the requester.
    Refunded {
        /// Custodian deposit receipt.
        reference: EscrowReference,
    },
}

impl EscrowStatus {
    /// Returns a short label for diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotDeposited => "not_deposited",
            Self::Deposited { .. } => "deposited",
            Self::Released { .. } => "released",
            Self::Refunded { .. } => "refunded",
        }
    }

    /// Returns the deposit receipt once funds have been locked.
    #[must_use]
    pub const fn reference(&self) -> Option<&EscrowReference> {
        match self {
            Self::NotDeposited => None,
            Self::Deposited { reference }
            | Self::Released { reference, .. }
            | Self::Refunded { reference } => Some(reference),
        }
    }
}

/// Expected-fields guard for a conditional task update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskExpectation {
    /// Status the stored task must still have.
    pub status: TaskStatus,
    /// Revision the stored task must still have.
    pub revision: u64,
}

/// Parameter object for posting a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Descriptive fields.
    pub listing: TaskListing,
    /// Posting requester.
    pub requester_id: UserId,
    /// Requester display name.
    pub requester_name: String,
    /// Gross budget.
    pub budget: Money,
    /// Completion deadline.
    pub deadline: DateTime<Utc>,
    /// Platform commission snapshot.
    pub commission: CommissionPercent,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    requester_id: UserId,
    requester_name: String,
    listing: TaskListing,
    budget: Money,
    deadline: DateTime<Utc>,
    commission: CommissionPercent,
    status: TaskStatus,
    selected_worker: Option<SelectedWorker>,
    worker_payout_address: Option<PayoutAddress>,
    escrow: EscrowStatus,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted requester identifier.
    pub requester_id: UserId,
    /// Persisted requester display name.
    pub requester_name: String,
    /// Persisted descriptive fields.
    pub listing: TaskListing,
    /// Persisted budget.
    pub budget: Money,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// Persisted commission rate.
    pub commission: CommissionPercent,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted worker selection.
    pub selected_worker: Option<SelectedWorker>,
    /// Persisted payout address.
    pub worker_payout_address: Option<PayoutAddress>,
    /// Persisted escrow state.
    pub escrow: EscrowStatus,
    /// Persisted revision counter.
    pub revision: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Posts a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NonPositiveBudget`] for a zero budget and
    /// [`TaskDomainError::DeadlineNotInFuture`] when the deadline is not after
    /// the current clock time.
    pub fn post(new_task: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let timestamp = clock.utc();
        if new_task.budget.is_zero() {
            return Err(TaskDomainError::NonPositiveBudget);
        }
        if new_task.deadline <= timestamp {
            return Err(TaskDomainError::DeadlineNotInFuture);
        }

        Ok(Self {
            id: TaskId::new(),
            requester_id: new_task.requester_id,
            requester_name: new_task.requester_name,
            listing: new_task.listing,
            budget: new_task.budget,
            deadline: new_task.deadline,
            commission: new_task.commission,
            status: TaskStatus::Open,
            selected_worker: None,
            worker_payout_address: None,
            escrow: EscrowStatus::NotDeposited,
            revision: 0,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            requester_id: data.requester_id,
            requester_name: data.requester_name,
            listing: data.listing,
            budget: data.budget,
            deadline: data.deadline,
            commission: data.commission,
            status: data.status,
            selected_worker: data.selected_worker,
            worker_payout_address: data.worker_payout_address,
            escrow: data.escrow,
            revision: data.revision,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the requester identifier.
    #[must_use]
    pub const fn requester_id(&self) -> &UserId {
        &self.requester_id
    }

    /// Returns the requester display name.
    #[must_use]
    pub fn requester_name(&self) -> &str {
        &self.requester_name
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn listing(&self) -> &TaskListing {
        &self.listing
    }

    /// Returns the gross budget.
    #[must_use]
    pub const fn budget(&self) -> &Money {
        &self.budget
    }

    /// Returns the completion deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the commission rate captured at posting time.
    #[must_use]
    pub const fn commission(&self) -> CommissionPercent {
        self.commission
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the selected worker, if any.
    #[must_use]
    pub const fn selected_worker(&self) -> Option<&SelectedWorker> {
        self.selected_worker.as_ref()
    }

    /// Returns the bound worker payout address, if any.
    #[must_use]
    pub const fn worker_payout_address(&self) -> Option<&PayoutAddress> {
        self.worker_payout_address.as_ref()
    }

    /// Returns the escrow state.
    #[must_use]
    pub const fn escrow(&self) -> &EscrowStatus {
        &self.escrow
    }

    /// Returns `true` once the budget has been locked with the custodian.
    #[must_use]
    pub const fn escrow_deposited(&self) -> bool {
        matches!(
            self.escrow,
            EscrowStatus::Deposited { .. } | EscrowStatus::Released { .. }
        )
    }

    /// Returns the optimistic concurrency revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the guard a conditional update of the current state must use.
    #[must_use]
    pub const fn expectation(&self) -> TaskExpectation {
        TaskExpectation {
            status: self.status,
            revision: self.revision,
        }
    }

    /// Returns `true` when `user` posted this task.
    #[must_use]
    pub fn is_requester(&self, user: &UserId) -> bool {
        &self.requester_id == user
    }

    /// Returns `true` when `user` is the selected worker.
    #[must_use]
    pub fn is_selected_worker(&self, user: &UserId) -> bool {
        self.selected_worker
            .as_ref()
            .is_some_and(|worker| &worker.worker_id == user)
    }

    /// Splits the budget into platform commission and worker net.
    #[must_use]
    pub fn commission_split(&self) -> CommissionSplit {
        self.commission.split(&self.budget)
    }

    /// Checks the selection and escrow invariants.
    ///
    /// A worker is selected exactly in the statuses that require one; closed
    /// tasks keep whatever selection they had for audit. Funded escrow implies
    /// a selected worker on a task that is no longer open.
    #[must_use]
    pub const fn holds_invariants(&self) -> bool {
        let selection_matches = matches!(self.status, TaskStatus::Closed)
            || self.selected_worker.is_some() == self.status.requires_selected_worker();
        let escrow_consistent = !self.escrow_deposited()
            || (self.selected_worker.is_some() && !matches!(self.status, TaskStatus::Open));
        selection_matches && escrow_consistent
    }

    /// Moves the task to `target` when the state machine permits it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] for transitions the
    /// lifecycle does not allow.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(target)?;
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    /// Records the selected worker and moves the task to `accepted`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// open.
    pub fn assign_worker(
        &mut self,
        worker: SelectedWorker,
        payout_address: Option<PayoutAddress>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Accepted)?;
        self.selected_worker = Some(worker);
        self.worker_payout_address = payout_address;
        self.status = TaskStatus::Accepted;
        self.touch(clock);
        Ok(())
    }

    /// Binds the worker payout address ahead of escrow deposit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::OperationNotAllowed`] unless the task is
    /// accepted, or [`TaskDomainError::EscrowStateMismatch`] once escrow is
    /// funded.
    pub fn bind_payout_address(
        &mut self,
        address: PayoutAddress,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_status(TaskStatus::Accepted, "bind payout address")?;
        self.ensure_escrow_not_deposited()?;
        self.worker_payout_address = Some(address);
        self.touch(clock);
        Ok(())
    }

    /// Records a successful custodian deposit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::OperationNotAllowed`] unless the task is
    /// accepted, or [`TaskDomainError::EscrowStateMismatch`] when escrow was
    /// already funded.
    pub fn record_escrow_deposit(
        &mut self,
        reference: EscrowReference,
        payout_address: PayoutAddress,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_status(TaskStatus::Accepted, "deposit escrow")?;
        self.ensure_escrow_not_deposited()?;
        self.worker_payout_address = Some(payout_address);
        self.escrow = EscrowStatus::Deposited { reference };
        self.touch(clock);
        Ok(())
    }

    /// Moves a funded, accepted task to `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// accepted, or [`TaskDomainError::EscrowStateMismatch`] when escrow has
    /// not been funded.
    pub fn start_work(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::InProgress)?;
        self.ensure_escrow_deposited()?;
        self.status = TaskStatus::InProgress;
        self.touch(clock);
        Ok(())
    }

    /// Moves a funded task to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// accepted or in progress, or [`TaskDomainError::EscrowStateMismatch`]
    /// when escrow is not holding funds.
    pub fn complete_work(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Completed)?;
        self.ensure_escrow_deposited()?;
        self.status = TaskStatus::Completed;
        self.touch(clock);
        Ok(())
    }

    /// Marks the work as approved and the escrow as released.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// completed, or [`TaskDomainError::EscrowStateMismatch`] when escrow is
    /// not holding funds.
    pub fn approve(
        &mut self,
        payout_tx: PayoutTxId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.ensure_can_approve()?;
        let EscrowStatus::Deposited { reference } = &self.escrow else {
            return Err(self.escrow_mismatch("deposited"));
        };
        self.escrow = EscrowStatus::Released {
            reference: reference.clone(),
            payout_tx,
        };
        self.status = TaskStatus::Approved;
        self.touch(clock);
        Ok(())
    }

    /// Checks that the task is completed and its escrow still holds funds.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task is
    /// completed, or [`TaskDomainError::EscrowStateMismatch`] when escrow is
    /// not holding funds.
    pub fn ensure_can_approve(&self) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Approved)?;
        self.ensure_escrow_deposited()
    }

    /// Closes the task, marking held escrow as refunded.
    ///
    /// Callers must have refunded any deposited escrow with the custodian
    /// before committing the closed task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the task is
    /// already terminal.
    pub fn close(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::Closed)?;
        if let EscrowStatus::Deposited { reference } = &self.escrow {
            self.escrow = EscrowStatus::Refunded {
                reference: reference.clone(),
            };
        }
        self.status = TaskStatus::Closed;
        self.touch(clock);
        Ok(())
    }

    fn ensure_transition(&self, target: TaskStatus) -> Result<(), TaskDomainError> {
        if self.status.can_transition_to(target) {
            return Ok(());
        }
        Err(TaskDomainError::InvalidStateTransition {
            task_id: self.id,
            from: self.status,
            to: target,
        })
    }

    fn ensure_status(
        &self,
        required: TaskStatus,
        operation: &'static str,
    ) -> Result<(), TaskDomainError> {
        if self.status == required {
            return Ok(());
        }
        Err(TaskDomainError::OperationNotAllowed {
            task_id: self.id,
            status: self.status,
            operation,
        })
    }

    fn ensure_escrow_not_deposited(&self) -> Result<(), TaskDomainError> {
        match self.escrow {
            EscrowStatus::NotDeposited => Ok(()),
            _ => Err(self.escrow_mismatch("not_deposited")),
        }
    }

    fn ensure_escrow_deposited(&self) -> Result<(), TaskDomainError> {
        match self.escrow {
            EscrowStatus::Deposited { .. } => Ok(()),
            _ => Err(self.escrow_mismatch("deposited")),
        }
    }

    const fn escrow_mismatch(&self, required: &'static str) -> TaskDomainError {
        TaskDomainError::EscrowStateMismatch {
            task_id: self.id,
            required,
            actual: self.escrow.label(),
        }
    }

    /// Updates the timestamp and bumps the revision.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
        self.revision = self.revision.saturating_add(1);
    }
}
