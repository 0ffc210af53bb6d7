//! In-memory record store for tasks, applications, and commission records.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        Application, ApplicationId, ApplicationStatus, CommissionRecord, Task, TaskExpectation,
        TaskId, TaskStatus, UserId,
    },
    ports::{
        ApplicationRepository, CommissionRepository, TaskRepository, TaskRepositoryError,
        TaskRepositoryResult,
    },
};

/// Thread-safe in-memory record store.
///
/// Each write takes the store-wide lock, so conditional updates are atomic
/// compare-and-swap operations exactly as a transactional document store
/// would provide them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    tasks: HashMap<TaskId, Task>,
    applications: HashMap<ApplicationId, Application>,
    commissions: HashMap<TaskId, CommissionRecord>,
    fail_commission_writes: bool,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent commission writes fail with a persistence error.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn set_commission_writes_failing(&self, failing: bool) -> TaskRepositoryResult<()> {
        self.write()?.fail_commission_writes = failing;
        Ok(())
    }

    /// Returns the number of stored commission records.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn commission_count(&self) -> TaskRepositoryResult<usize> {
        Ok(self.read()?.commissions.len())
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

/// Collects matching tasks ordered by creation time.
fn collect_tasks(state: &InMemoryStoreState, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
    let mut tasks: Vec<Task> = state
        .tasks
        .values()
        .filter(|task| predicate(task))
        .cloned()
        .collect();
    tasks.sort_by_key(|task| (task.created_at(), task.id()));
    tasks
}

#[async_trait]
impl TaskRepository for InMemoryRecordStore {
    async fn store_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_task_if(
        &self,
        expected: TaskExpectation,
        task: &Task,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let stored = state
            .tasks
            .get(&task.id())
            .ok_or(TaskRepositoryError::TaskNotFound(task.id()))?;
        if stored.expectation() != expected {
            return Err(TaskRepositoryError::Conflict {
                task_id: task.id(),
                expected: expected.status,
                actual: stored.status(),
            });
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(collect_tasks(&state, |task| task.status() == status))
    }

    async fn list_tasks_by_requester(
        &self,
        requester: &UserId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(collect_tasks(&state, |task| task.is_requester(requester)))
    }

    async fn list_tasks_by_worker(&self, worker: &UserId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.read()?;
        Ok(collect_tasks(&state, |task| task.is_selected_worker(worker)))
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryRecordStore {
    async fn store_application(&self, application: &Application) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let has_pending = state.applications.values().any(|existing| {
            existing.task_id() == application.task_id()
                && existing.worker_id() == application.worker_id()
                && existing.status() == ApplicationStatus::Pending
        });
        if has_pending {
            return Err(TaskRepositoryError::DuplicatePendingApplication {
                task_id: application.task_id(),
                worker: application.worker_id().clone(),
            });
        }
        state
            .applications
            .insert(application.id(), application.clone());
        Ok(())
    }

    async fn update_application_if(
        &self,
        expected: ApplicationStatus,
        application: &Application,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let stored = state
            .applications
            .get(&application.id())
            .ok_or(TaskRepositoryError::ApplicationNotFound(application.id()))?;
        if stored.status() != expected {
            return Err(TaskRepositoryError::ApplicationConflict {
                application_id: application.id(),
                expected,
                actual: stored.status(),
            });
        }
        state
            .applications
            .insert(application.id(), application.clone());
        Ok(())
    }

    async fn find_application(
        &self,
        id: ApplicationId,
    ) -> TaskRepositoryResult<Option<Application>> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    async fn list_applications(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Application>> {
        let state = self.read()?;
        let mut applications: Vec<Application> = state
            .applications
            .values()
            .filter(|application| application.task_id() == task_id)
            .cloned()
            .collect();
        applications.sort_by_key(|application| (application.created_at(), application.id()));
        Ok(applications)
    }

    async fn find_pending_application(
        &self,
        task_id: TaskId,
        worker: &UserId,
    ) -> TaskRepositoryResult<Option<Application>> {
        let state = self.read()?;
        Ok(state
            .applications
            .values()
            .find(|application| {
                application.task_id() == task_id
                    && application.worker_id() == worker
                    && application.status() == ApplicationStatus::Pending
            })
            .cloned())
    }
}

#[async_trait]
impl CommissionRepository for InMemoryRecordStore {
    async fn store_commission(&self, record: &CommissionRecord) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        if state.fail_commission_writes {
            return Err(TaskRepositoryError::persistence(std::io::Error::other(
                "commission writes disabled",
            )));
        }
        if state.commissions.contains_key(&record.task_id()) {
            return Err(TaskRepositoryError::DuplicateCommission(record.task_id()));
        }
        state.commissions.insert(record.task_id(), record.clone());
        Ok(())
    }

    async fn find_commission(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Option<CommissionRecord>> {
        Ok(self.read()?.commissions.get(&task_id).cloned())
    }
}
