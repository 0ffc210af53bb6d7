//! Task lifecycle engine: posting, applications, and worker selection.
//!
//! Every status change is committed with a conditional update against the
//! record store, and notifications are queued in an [`Outbox`] that is only
//! dispatched after the write succeeds.

use super::{
    error::{TaskLifecycleError, TaskLifecycleResult},
    notices,
    requests::{ApplyRequest, CreateTaskRequest, Selection},
};
use crate::config::{ConfigError, EngineConfig};
use crate::escrow::ports::EscrowCustodian;
use crate::notification::{outbox::Outbox, ports::NotificationSink};
use crate::task::{
    domain::{
        Application, ApplicationId, ApplicationStatus, CommissionPercent, CurrencyCode, Money,
        NewTask, PayoutAddress, SelectedWorker, Task, TaskDomainError, TaskId, TaskListing,
        TaskStatus, UserId,
    },
    ports::{ApplicationRepository, CommissionRepository, TaskRepository, TaskRepositoryError},
};
use futures::future::join_all;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Engine settings resolved from a validated [`EngineConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EngineSettings {
    pub(super) commission: CommissionPercent,
    pub(super) call_timeout: Duration,
    pub(super) rejection_batch_size: usize,
    pub(super) administrators: Vec<UserId>,
}

impl EngineSettings {
    fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let to_invalid = |field: &'static str| {
            move |err: TaskDomainError| ConfigError::Invalid {
                field,
                reason: err.to_string(),
            }
        };
        Ok(Self {
            commission: config.commission().map_err(to_invalid("commission_percent"))?,
            call_timeout: config.external_call_timeout(),
            rejection_batch_size: config.rejection_batch_size,
            administrators: config
                .administrator_ids()
                .map_err(to_invalid("administrators"))?,
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            commission: CommissionPercent::STANDARD,
            call_timeout: config.external_call_timeout(),
            rejection_batch_size: config.rejection_batch_size,
            administrators: Vec::new(),
        }
    }
}

/// Decision applied to a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Decision {
    Approve,
    Reject,
}

impl Decision {
    const fn target(self) -> ApplicationStatus {
        match self {
            Self::Approve => ApplicationStatus::Approved,
            Self::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Task lifecycle orchestration service.
///
/// Holds no mutable state of its own: the record store is the single source
/// of truth and serialization point, so any number of clones may serve
/// concurrent callers.
#[derive(Clone)]
pub struct TaskLifecycleService<S, E, N, C>
where
    S: TaskRepository + ApplicationRepository + CommissionRepository,
    E: EscrowCustodian,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    pub(super) store: Arc<S>,
    pub(super) custodian: Arc<E>,
    pub(super) notifier: Arc<N>,
    pub(super) clock: Arc<C>,
    pub(super) settings: EngineSettings,
}

impl<S, E, N, C> TaskLifecycleService<S, E, N, C>
where
    S: TaskRepository + ApplicationRepository + CommissionRepository,
    E: EscrowCustodian,
    N: NotificationSink,
    C: Clock + Send + Sync,
{
    /// Creates a service with default engine settings.
    #[must_use]
    pub fn new(store: Arc<S>, custodian: Arc<E>, notifier: Arc<N>, clock: Arc<C>) -> Self {
        Self {
            store,
            custodian,
            notifier,
            clock,
            settings: EngineSettings::default(),
        }
    }

    /// Applies engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration fails
    /// validation.
    pub fn with_config(mut self, config: &EngineConfig) -> Result<Self, ConfigError> {
        self.settings = EngineSettings::from_config(config)?;
        Ok(self)
    }

    /// Posts a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for a blank title or
    /// description, a zero budget, a malformed currency, or a deadline that is
    /// not in the future, and repository errors when persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let requester_id = UserId::new(request.requester_id)?;
        let requester_name = request
            .requester_name
            .unwrap_or_else(|| requester_id.as_str().to_owned());
        let mut listing = TaskListing::new(request.title, request.description)?
            .with_tags(request.tags)
            .with_required_skills(request.required_skills);
        if let Some(category) = request.category {
            listing = listing.with_category(category);
        }
        let currency = CurrencyCode::new(request.currency)?;

        let task = Task::post(
            NewTask {
                listing,
                requester_id,
                requester_name,
                budget: Money::new(request.budget_minor_units, currency),
                deadline: request.deadline,
                commission: self.settings.commission,
            },
            &*self.clock,
        )?;
        self.store.store_task(&task).await?;
        info!(task_id = %task.id(), requester = %task.requester_id(), budget = %task.budget(), "task posted");

        let mut outbox = Outbox::new();
        for administrator in &self.settings.administrators {
            outbox.push(notices::task_posted(&task, administrator.clone()));
        }
        self.dispatch(outbox).await;
        Ok(task)
    }

    /// Retrieves a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::TaskNotFound`] when the task does not
    /// exist.
    pub async fn get_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.load_task(task_id).await
    }

    /// Lists tasks that accept applications, oldest first.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the query fails.
    pub async fn list_open_tasks(&self) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.store.list_tasks_by_status(TaskStatus::Open).await?)
    }

    /// Lists tasks posted by a requester.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the query fails.
    pub async fn list_tasks_by_requester(
        &self,
        requester: &UserId,
    ) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.store.list_tasks_by_requester(requester).await?)
    }

    /// Lists tasks on which the worker was selected.
    ///
    /// # Errors
    ///
    /// Returns repository errors when the query fails.
    pub async fn list_tasks_by_worker(&self, worker: &UserId) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.store.list_tasks_by_worker(worker).await?)
    }

    /// Lists every application for a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::TaskNotFound`] when the task does not
    /// exist.
    pub async fn list_applications(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<Application>> {
        self.load_task(task_id).await?;
        Ok(self.store.list_applications(task_id).await?)
    }

    /// Submits a worker's application to an open task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::InvalidState`] when the task is not open
    /// or the worker already has a pending application,
    /// [`TaskLifecycleError::Forbidden`] when the requester applies to their
    /// own task, and [`TaskLifecycleError::Validation`] for malformed input.
    pub async fn apply(&self, request: ApplyRequest) -> TaskLifecycleResult<Application> {
        let worker_id = UserId::new(request.worker_id)?;
        let payout_address = request
            .payout_address
            .map(PayoutAddress::new)
            .transpose()?;
        let task = self.load_task(request.task_id).await?;
        if task.is_requester(&worker_id) {
            return Err(TaskLifecycleError::Forbidden {
                user: worker_id,
                task_id: task.id(),
                action: "apply",
            });
        }
        ensure_open_for_applications(&task)?;
        if self
            .store
            .find_pending_application(task.id(), &worker_id)
            .await?
            .is_some()
        {
            return Err(already_applied(task.id(), worker_id));
        }

        let worker_name = request
            .worker_name
            .unwrap_or_else(|| worker_id.as_str().to_owned());
        let mut application = Application::submit(task.id(), worker_id, worker_name, &*self.clock);
        if let Some(proposal) = request.proposal {
            application = application.with_proposal(proposal);
        }
        if let Some(address) = payout_address {
            application = application.with_payout_address(address);
        }
        match self.store.store_application(&application).await {
            Ok(()) => {}
            Err(TaskRepositoryError::DuplicatePendingApplication { task_id, worker }) => {
                return Err(already_applied(task_id, worker));
            }
            Err(err) => return Err(err.into()),
        }

        // A selection may have committed between the status check and the
        // insert; the bid must not stay pending on a task that moved on.
        let current = self.load_task(task.id()).await?;
        if current.status() != TaskStatus::Open {
            return self.settle_late_application(&current, application).await;
        }
        info!(task_id = %task.id(), application_id = %application.id(), worker = %application.worker_id(), "application submitted");

        let mut outbox = Outbox::new();
        outbox.push(notices::application_received(&task, &application));
        self.dispatch(outbox).await;
        Ok(application)
    }

    /// Attaches a payout address to the worker's application.
    ///
    /// When the application is the selected one and escrow is not yet funded,
    /// the address is also bound on the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] when the caller did not
    /// submit the application, [`TaskLifecycleError::InvalidState`] when it
    /// was rejected, and [`TaskLifecycleError::Conflict`] when a concurrent
    /// update won.
    pub async fn attach_payout_address(
        &self,
        application_id: ApplicationId,
        worker: &UserId,
        address: &str,
    ) -> TaskLifecycleResult<Application> {
        let payout_address = PayoutAddress::new(address)?;
        let mut application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or(TaskLifecycleError::ApplicationNotFound(application_id))?;
        if application.worker_id() != worker {
            return Err(TaskLifecycleError::Forbidden {
                user: worker.clone(),
                task_id: application.task_id(),
                action: "attach a payout address",
            });
        }

        let expected = application.status();
        application.attach_payout_address(payout_address.clone(), &*self.clock)?;
        self.store
            .update_application_if(expected, &application)
            .await?;

        let task = self.load_task(application.task_id()).await?;
        let is_selected = task
            .selected_worker()
            .is_some_and(|selected| selected.application_id == application_id);
        if is_selected && task.status() == TaskStatus::Accepted && !task.escrow_deposited() {
            let task_expected = task.expectation();
            let mut bound = task;
            bound.bind_payout_address(payout_address, &*self.clock)?;
            self.store.update_task_if(task_expected, &bound).await?;
            debug!(task_id = %bound.id(), "payout address bound on task");
        }
        Ok(application)
    }

    /// Selects an applicant, accepting the task and rejecting every sibling.
    ///
    /// Re-issuing the call for the application that already won resumes an
    /// interrupted rejection fan-out and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Forbidden`] unless the caller is the
    /// requester, [`TaskLifecycleError::ApplicationNotFound`] when the
    /// application does not belong to the task,
    /// [`TaskLifecycleError::InvalidState`] when the application is not
    /// pending or the task cannot accept a worker, and
    /// [`TaskLifecycleError::Conflict`] when a competing selection won.
    pub async fn select_applicant(
        &self,
        task_id: TaskId,
        application_id: ApplicationId,
        requester: &UserId,
    ) -> TaskLifecycleResult<Selection> {
        // Application before task: a competing winner rejects siblings only
        // after its task write, so the loser always meets a task conflict.
        let application = self.load_application(task_id, application_id).await?;
        let task = self.load_task(task_id).await?;
        ensure_requester(&task, requester, "select an applicant")?;

        let (accepted, newly_selected) = if task.status() == TaskStatus::Open {
            (self.accept_application(task, &application).await?, true)
        } else {
            match task.selected_worker() {
                Some(selected) if selected.application_id == application_id => {
                    debug!(task_id = %task_id, application_id = %application_id, "resuming selection fan-out");
                    (task, false)
                }
                Some(_) => return Err(selection_lost(&task)),
                None => {
                    return Err(TaskLifecycleError::InvalidState(
                        TaskDomainError::InvalidStateTransition {
                            task_id,
                            from: task.status(),
                            to: TaskStatus::Accepted,
                        },
                    ));
                }
            }
        };

        let (approved, approved_now) = self
            .decide_application(application, Decision::Approve)
            .await?;
        let (rejected, unresolved) = self
            .reject_pending_applications(&accepted, Some(application_id))
            .await?;
        if unresolved > 0 {
            warn!(task_id = %task_id, unresolved, "sibling rejection incomplete; retry selection to finish");
        }

        let mut outbox = Outbox::new();
        if newly_selected || approved_now {
            outbox.push(notices::worker_selected(&accepted, &approved));
        }
        for sibling in &rejected {
            outbox.push(notices::application_rejected(&accepted, sibling));
        }
        self.dispatch(outbox).await;

        Ok(Selection {
            task: accepted,
            application: approved,
            rejected: rejected.iter().map(Application::id).collect(),
            unresolved,
        })
    }

    async fn accept_application(
        &self,
        task: Task,
        application: &Application,
    ) -> TaskLifecycleResult<Task> {
        if application.status() != ApplicationStatus::Pending {
            return Err(TaskLifecycleError::InvalidState(
                TaskDomainError::InvalidApplicationTransition {
                    application_id: application.id(),
                    from: application.status(),
                    to: ApplicationStatus::Approved,
                },
            ));
        }
        let expected = task.expectation();
        let mut accepted = task;
        accepted.assign_worker(
            SelectedWorker {
                application_id: application.id(),
                worker_id: application.worker_id().clone(),
                worker_name: application.worker_name().to_owned(),
            },
            application.payout_address().cloned(),
            &*self.clock,
        )?;
        self.store.update_task_if(expected, &accepted).await?;
        info!(task_id = %accepted.id(), application_id = %application.id(), worker = %application.worker_id(), "applicant selected");
        Ok(accepted)
    }

    /// Applies `decision` to a pending application.
    ///
    /// Returns the stored application and whether this call changed it. An
    /// application that already carries the decided status is left alone.
    pub(super) async fn decide_application(
        &self,
        application: Application,
        decision: Decision,
    ) -> TaskLifecycleResult<(Application, bool)> {
        if application.status() == decision.target() {
            return Ok((application, false));
        }
        let mut decided = application;
        match decision {
            Decision::Approve => decided.approve(&*self.clock)?,
            Decision::Reject => decided.reject(&*self.clock)?,
        }
        match self
            .store
            .update_application_if(ApplicationStatus::Pending, &decided)
            .await
        {
            Ok(()) => Ok((decided, true)),
            Err(TaskRepositoryError::ApplicationConflict { actual, .. })
                if actual == decision.target() =>
            {
                let stored = self.load_application(decided.task_id(), decided.id()).await?;
                Ok((stored, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rejects every pending application on the task except `keep`.
    ///
    /// Rejections run as bounded batches of independent conditional updates.
    /// Failures are logged and counted rather than propagated.
    pub(super) async fn reject_pending_applications(
        &self,
        task: &Task,
        keep: Option<ApplicationId>,
    ) -> TaskLifecycleResult<(Vec<Application>, usize)> {
        let pending: Vec<Application> = self
            .store
            .list_applications(task.id())
            .await?
            .into_iter()
            .filter(|application| {
                Some(application.id()) != keep
                    && application.status() == ApplicationStatus::Pending
            })
            .collect();

        let mut rejected = Vec::new();
        let mut unresolved = 0_usize;
        for batch in pending.chunks(self.settings.rejection_batch_size) {
            let outcomes = join_all(
                batch
                    .iter()
                    .cloned()
                    .map(|application| self.decide_application(application, Decision::Reject)),
            )
            .await;
            for outcome in outcomes {
                match outcome {
                    Ok((application, true)) => rejected.push(application),
                    Ok((_, false)) => {}
                    Err(err) => {
                        warn!(task_id = %task.id(), error = %err, "failed to reject pending application");
                        unresolved += 1;
                    }
                }
            }
        }
        debug!(task_id = %task.id(), rejected = rejected.len(), unresolved, "pending application rejection finished");
        Ok((rejected, unresolved))
    }

    /// Resolves an application inserted after the task left `open`.
    async fn settle_late_application(
        &self,
        current: &Task,
        application: Application,
    ) -> TaskLifecycleResult<Application> {
        let was_selected = current
            .selected_worker()
            .is_some_and(|selected| selected.application_id == application.id());
        if was_selected {
            return self
                .load_application(application.task_id(), application.id())
                .await;
        }
        if let Err(err) = self
            .decide_application(application, Decision::Reject)
            .await
        {
            warn!(task_id = %current.id(), error = %err, "failed to reject late application");
        }
        Err(not_open_for_applications(current))
    }

    pub(super) async fn load_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or(TaskLifecycleError::TaskNotFound(task_id))
    }

    async fn load_application(
        &self,
        task_id: TaskId,
        application_id: ApplicationId,
    ) -> TaskLifecycleResult<Application> {
        self.store
            .find_application(application_id)
            .await?
            .filter(|application| application.task_id() == task_id)
            .ok_or(TaskLifecycleError::ApplicationNotFound(application_id))
    }

    /// Sends queued notifications after the authoritative write committed.
    pub(super) async fn dispatch(&self, outbox: Outbox) {
        if outbox.is_empty() {
            return;
        }
        outbox
            .dispatch(&*self.notifier, self.settings.call_timeout)
            .await;
    }

    pub(super) fn is_administrator(&self, user: &UserId) -> bool {
        self.settings.administrators.contains(user)
    }
}

pub(super) fn ensure_requester(
    task: &Task,
    user: &UserId,
    action: &'static str,
) -> TaskLifecycleResult<()> {
    if task.is_requester(user) {
        return Ok(());
    }
    Err(TaskLifecycleError::Forbidden {
        user: user.clone(),
        task_id: task.id(),
        action,
    })
}

pub(super) fn ensure_selected_worker(
    task: &Task,
    user: &UserId,
    action: &'static str,
) -> TaskLifecycleResult<()> {
    if task.is_selected_worker(user) {
        return Ok(());
    }
    Err(TaskLifecycleError::Forbidden {
        user: user.clone(),
        task_id: task.id(),
        action,
    })
}

fn ensure_open_for_applications(task: &Task) -> TaskLifecycleResult<()> {
    if task.status() == TaskStatus::Open {
        return Ok(());
    }
    Err(not_open_for_applications(task))
}

const fn not_open_for_applications(task: &Task) -> TaskLifecycleError {
    TaskLifecycleError::InvalidState(TaskDomainError::OperationNotAllowed {
        task_id: task.id(),
        status: task.status(),
        operation: "apply",
    })
}

const fn already_applied(task_id: TaskId, worker: UserId) -> TaskLifecycleError {
    TaskLifecycleError::InvalidState(TaskDomainError::AlreadyApplied { task_id, worker })
}

/// A competing selection committed before this one observed the task.
fn selection_lost(task: &Task) -> TaskLifecycleError {
    TaskLifecycleError::Conflict(TaskRepositoryError::Conflict {
        task_id: task.id(),
        expected: TaskStatus::Open,
        actual: task.status(),
    })
}
