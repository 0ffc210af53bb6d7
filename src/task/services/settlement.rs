//! Escrow funding, work progress, approval, and administrative overrides.
//!
//! Calls to the escrow custodian always precede the conditional write they
//! justify. A failed or timed-out custodian call therefore leaves the task
//! exactly as it was, and re-issuing the operation is safe because the
//! custodian is idempotent by task identifier.

use super::{
    error::{TaskLifecycleError, TaskLifecycleResult},
    lifecycle::{TaskLifecycleService, ensure_requester, ensure_selected_worker},
    notices,
    requests::ReconciliationReport,
};
use crate::escrow::{domain::EscrowRequest, ports::EscrowCustodian};
use crate::external::{ExternalService, call_with_timeout};
use crate::notification::{outbox::Outbox, ports::NotificationSink};
use crate::task::{
    domain::{
        CommissionRecord, PayoutAddress, Task, TaskDomainError, TaskId, TaskStatus, UserId,
    },
    ports::{ApplicationRepository, CommissionRepository, TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use tracing::{debug, info, warn};

impl<S, E, N, C> TaskLifecycleService<S, E, N, C>
where
    S: TaskRepository + ApplicationRepository + CommissionRepository,
    E: EscrowCustodian,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Locks the task budget with the escrow custodian.
    ///
    /// `payout_address` overrides the address bound at selection time. A task
    /// whose escrow is already funded is returned unchanged without calling
    /// the custodian again.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// requester, [`TaskLifecycleError::InvalidState`] unless the task is
    /// accepted, [`TaskLifecycleError::Validation`] when no payout address is
    /// known, and [`TaskLifecycleError::ExternalService`] when the custodian
    /// call fails or times out.
    pub async fn deposit_escrow(
        &self,
        task_id: TaskId,
        requester: &UserId,
        payout_address: Option<&str>,
    ) -> TaskLifecycleResult<Task> {
        let override_address = payout_address.map(PayoutAddress::new).transpose()?;
        let task = self.load_task(task_id).await?;
        ensure_requester(&task, requester, "deposit escrow")?;
        if task.escrow_deposited() {
            debug!(task_id = %task_id, "escrow already deposited");
            return Ok(task);
        }
        if task.status() != TaskStatus::Accepted {
            return Err(TaskLifecycleError::InvalidState(
                TaskDomainError::OperationNotAllowed {
                    task_id,
                    status: task.status(),
                    operation: "deposit escrow",
                },
            ));
        }
        let beneficiary = override_address
            .or_else(|| task.worker_payout_address().cloned())
            .ok_or(TaskLifecycleError::Validation(
                TaskDomainError::MissingPayoutAddress(task_id),
            ))?;

        let request = EscrowRequest {
            task_id,
            amount: task.budget().clone(),
            deadline: task.deadline(),
            beneficiary: beneficiary.clone(),
        };
        let reference = call_with_timeout(
            ExternalService::EscrowCustodian,
            self.settings.call_timeout,
            self.custodian.create_escrow(&request),
        )
        .await?;

        let expected = task.expectation();
        let mut funded = task;
        funded.record_escrow_deposit(reference, beneficiary, &*self.clock)?;
        if let Err(err) = self.store.update_task_if(expected, &funded).await {
            return self.recover_lost_deposit(task_id, err).await;
        }
        info!(task_id = %task_id, amount = %funded.budget(), "escrow deposited");

        let mut outbox = Outbox::new();
        if let Some(worker) = funded.selected_worker() {
            outbox.push(notices::escrow_funded(&funded, worker.worker_id.clone()));
        }
        self.dispatch(outbox).await;
        Ok(funded)
    }

    /// A concurrent retry may have recorded the same deposit first. When the
    /// task left `accepted` instead, the funds just locked belong to no
    /// deposit the record will ever show and are handed back.
    async fn recover_lost_deposit(
        &self,
        task_id: TaskId,
        err: TaskRepositoryError,
    ) -> TaskLifecycleResult<Task> {
        if !matches!(err, TaskRepositoryError::Conflict { .. }) {
            return Err(err.into());
        }
        let current = self.load_task(task_id).await?;
        if current.escrow_deposited() {
            debug!(task_id = %task_id, "concurrent deposit already committed");
            return Ok(current);
        }
        if current.status() != TaskStatus::Accepted {
            warn!(
                task_id = %task_id,
                status = %current.status(),
                "task moved on during deposit; refunding orphaned escrow"
            );
            call_with_timeout(
                ExternalService::EscrowCustodian,
                self.settings.call_timeout,
                self.custodian.refund_escrow(task_id),
            )
            .await?;
        }
        Err(err.into())
    }

    /// Moves a funded task to `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// selected worker and [`TaskLifecycleError::InvalidState`] unless the task
    /// is accepted with escrow deposited.
    pub async fn start_work(&self, task_id: TaskId, worker: &UserId) -> TaskLifecycleResult<Task> {
        let task = self.load_task(task_id).await?;
        ensure_selected_worker(&task, worker, "start work")?;
        if task.status() == TaskStatus::InProgress {
            return Ok(task);
        }
        let expected = task.expectation();
        let mut started = task;
        started.start_work(&*self.clock)?;
        self.store.update_task_if(expected, &started).await?;
        info!(task_id = %task_id, worker = %worker, "work started");

        let mut outbox = Outbox::new();
        outbox.push(notices::work_started(&started));
        self.dispatch(outbox).await;
        Ok(started)
    }

    /// Marks the work complete on behalf of the selected worker.
    ///
    /// The custodian is told about completion on a best-effort basis; its
    /// failure is logged and does not undo the status change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// selected worker and [`TaskLifecycleError::InvalidState`] unless the task
    /// is accepted or in progress with escrow deposited.
    pub async fn mark_complete(
        &self,
        task_id: TaskId,
        worker: &UserId,
    ) -> TaskLifecycleResult<Task> {
        let task = self.load_task(task_id).await?;
        ensure_selected_worker(&task, worker, "mark complete")?;
        if task.status() == TaskStatus::Completed {
            return Ok(task);
        }
        let expected = task.expectation();
        let mut completed = task;
        completed.complete_work(&*self.clock)?;
        self.store.update_task_if(expected, &completed).await?;
        info!(task_id = %task_id, worker = %worker, "work marked complete");

        let mirrored = call_with_timeout(
            ExternalService::EscrowCustodian,
            self.settings.call_timeout,
            self.custodian.mark_complete(task_id),
        )
        .await;
        if let Err(err) = mirrored {
            warn!(task_id = %task_id, error = %err, "custodian completion mirror failed");
        }

        let mut outbox = Outbox::new();
        outbox.push(notices::work_completed(&completed));
        self.dispatch(outbox).await;
        Ok(completed)
    }

    /// Approves completed work, releasing escrow and recording commission.
    ///
    /// Re-issuing the call for an approved task returns it unchanged, never
    /// releases funds twice, and writes the commission record if an earlier
    /// attempt could not.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// requester, [`TaskLifecycleError::InvalidState`] unless the task is
    /// completed with escrow deposited, and
    /// [`TaskLifecycleError::ExternalService`] when the release fails.
    pub async fn approve_task(
        &self,
        task_id: TaskId,
        requester: &UserId,
    ) -> TaskLifecycleResult<Task> {
        let task = self.load_task(task_id).await?;
        ensure_requester(&task, requester, "approve")?;
        if task.status() == TaskStatus::Approved {
            debug!(task_id = %task_id, "task already approved");
            self.record_commission_best_effort(&task).await;
            return Ok(task);
        }
        task.ensure_can_approve()?;

        let payout_tx = call_with_timeout(
            ExternalService::EscrowCustodian,
            self.settings.call_timeout,
            self.custodian.release_escrow(task_id),
        )
        .await?;

        let expected = task.expectation();
        let mut approved = task;
        approved.approve(payout_tx, &*self.clock)?;
        if let Err(err) = self.store.update_task_if(expected, &approved).await {
            return self.recover_lost_approval(task_id, err).await;
        }
        let split = approved.commission_split();
        info!(
            task_id = %task_id,
            gross = %split.gross(),
            commission = %split.commission(),
            net = %split.net(),
            "task approved and escrow released"
        );
        self.record_commission_best_effort(&approved).await;

        let mut outbox = Outbox::new();
        if let Some(worker) = approved.selected_worker() {
            outbox.push(notices::payment_released(&approved, worker.worker_id.clone()));
        }
        self.dispatch(outbox).await;
        Ok(approved)
    }

    /// A concurrent approval may have committed between read and write.
    async fn recover_lost_approval(
        &self,
        task_id: TaskId,
        err: TaskRepositoryError,
    ) -> TaskLifecycleResult<Task> {
        if !matches!(err, TaskRepositoryError::Conflict { .. }) {
            return Err(err.into());
        }
        let current = self.load_task(task_id).await?;
        if current.status() != TaskStatus::Approved {
            return Err(err.into());
        }
        debug!(task_id = %task_id, "concurrent approval already committed");
        self.record_commission_best_effort(&current).await;
        Ok(current)
    }

    /// Returns the commission record written for an approved task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::TaskNotFound`] when the task does not
    /// exist.
    pub async fn commission_for(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Option<CommissionRecord>> {
        self.load_task(task_id).await?;
        Ok(self.store.find_commission(task_id).await?)
    }

    /// Writes missing commission records for approved tasks.
    ///
    /// # Errors
    ///
    /// Returns repository errors when approved tasks cannot be listed.
    /// Per-task write failures are counted in the report.
    pub async fn reconcile_commissions(&self) -> TaskLifecycleResult<ReconciliationReport> {
        let approved = self.store.list_tasks_by_status(TaskStatus::Approved).await?;
        let mut report = ReconciliationReport {
            examined: approved.len(),
            ..ReconciliationReport::default()
        };
        for task in &approved {
            match self.record_commission(task).await {
                Ok(true) => report.recorded += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(task_id = %task.id(), error = %err, "commission reconciliation failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            examined = report.examined,
            recorded = report.recorded,
            failed = report.failed,
            "commission reconciliation finished"
        );
        Ok(report)
    }

    /// Moves completed work into dispute.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// requester, the selected worker, or an administrator, and
    /// [`TaskLifecycleError::InvalidState`] unless the task is completed.
    pub async fn dispute(&self, task_id: TaskId, user: &UserId) -> TaskLifecycleResult<Task> {
        let task = self.load_task(task_id).await?;
        let is_party = task.is_requester(user) || task.is_selected_worker(user);
        if !is_party && !self.is_administrator(user) {
            return Err(TaskLifecycleError::Forbidden {
                user: user.clone(),
                task_id,
                action: "dispute",
            });
        }
        let expected = task.expectation();
        let mut disputed = task;
        disputed.transition_to(TaskStatus::Disputed, &*self.clock)?;
        self.store.update_task_if(expected, &disputed).await?;
        info!(task_id = %task_id, raised_by = %user, "task disputed");

        let mut outbox = Outbox::new();
        let body = format!(
            "\"{}\" is under dispute. An administrator will review it.",
            disputed.listing().title()
        );
        for notice in notices::to_both_parties(&disputed, "Task disputed", &body) {
            outbox.push(notice);
        }
        self.dispatch(outbox).await;
        Ok(disputed)
    }

    /// Closes a task, refunding any escrow still held.
    ///
    /// Administrators may close any non-terminal task; the requester may only
    /// withdraw a posting that is still open. Closing a closed task returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] for other callers,
    /// [`TaskLifecycleError::InvalidState`] for an approved task, and
    /// [`TaskLifecycleError::ExternalService`] when the refund fails.
    pub async fn close(&self, task_id: TaskId, user: &UserId) -> TaskLifecycleResult<Task> {
        let task = self.load_task(task_id).await?;
        let withdrawing = task.status() == TaskStatus::Open && task.is_requester(user);
        if !withdrawing && !self.is_administrator(user) {
            return Err(TaskLifecycleError::Forbidden {
                user: user.clone(),
                task_id,
                action: "close",
            });
        }
        if task.status() == TaskStatus::Closed {
            return Ok(task);
        }
        if !task.status().can_transition_to(TaskStatus::Closed) {
            return Err(TaskLifecycleError::InvalidState(
                TaskDomainError::InvalidStateTransition {
                    task_id,
                    from: task.status(),
                    to: TaskStatus::Closed,
                },
            ));
        }
        let refunding = task.escrow_deposited();
        if refunding {
            call_with_timeout(
                ExternalService::EscrowCustodian,
                self.settings.call_timeout,
                self.custodian.refund_escrow(task_id),
            )
            .await?;
        }

        let was_open = task.status() == TaskStatus::Open;
        let expected = task.expectation();
        let mut closed = task;
        closed.close(&*self.clock)?;
        self.store.update_task_if(expected, &closed).await?;
        info!(task_id = %task_id, closed_by = %user, refunded = refunding, "task closed");

        let mut outbox = Outbox::new();
        if was_open {
            let (rejected, unresolved) = self.reject_pending_applications(&closed, None).await?;
            if unresolved > 0 {
                warn!(task_id = %task_id, unresolved, "pending applications left on closed task");
            }
            for application in &rejected {
                outbox.push(notices::application_rejected(&closed, application));
            }
        }
        let body = if refunding {
            format!(
                "\"{}\" was closed and the escrowed {} refunded.",
                closed.listing().title(),
                closed.budget()
            )
        } else {
            format!("\"{}\" was closed.", closed.listing().title())
        };
        for notice in notices::to_both_parties(&closed, "Task closed", &body) {
            outbox.push(notice);
        }
        self.dispatch(outbox).await;
        Ok(closed)
    }

    async fn record_commission_best_effort(&self, task: &Task) {
        if let Err(err) = self.record_commission(task).await {
            warn!(task_id = %task.id(), error = %err, "commission record not written; reconcile later");
        }
    }

    /// Writes the task's commission record unless one exists.
    ///
    /// Returns `true` when this call wrote the record.
    async fn record_commission(&self, task: &Task) -> TaskLifecycleResult<bool> {
        if self.store.find_commission(task.id()).await?.is_some() {
            return Ok(false);
        }
        let record = CommissionRecord::for_approved_task(task, &*self.clock)?;
        match self.store.store_commission(&record).await {
            Ok(()) => {
                info!(
                    task_id = %task.id(),
                    commission = %record.commission(),
                    net = %record.net(),
                    "commission recorded"
                );
                Ok(true)
            }
            Err(TaskRepositoryError::DuplicateCommission(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
