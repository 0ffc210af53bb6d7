//! Record store ports for tasks, applications, and commission records.
//!
//! Every status-changing write is conditional: the store compares the stored
//! document against an expected prior state and refuses with
//! [`TaskRepositoryError::Conflict`] when another writer got there first.

use crate::task::domain::{
    Application, ApplicationId, ApplicationStatus, CommissionRecord, Task, TaskExpectation,
    TaskId, TaskStatus, UserId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for record store operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task document persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the identifier is
    /// already stored.
    async fn store_task(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Replaces a task only if the stored document still matches `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::TaskNotFound`] when the task does not
    /// exist and [`TaskRepositoryError::Conflict`] when its status or revision
    /// moved on.
    async fn update_task_if(
        &self,
        expected: TaskExpectation,
        task: &Task,
    ) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns tasks in the given status, oldest first.
    async fn list_tasks_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns tasks posted by a requester, oldest first.
    async fn list_tasks_by_requester(&self, requester: &UserId)
    -> TaskRepositoryResult<Vec<Task>>;

    /// Returns tasks on which the worker was selected, oldest first.
    async fn list_tasks_by_worker(&self, worker: &UserId) -> TaskRepositoryResult<Vec<Task>>;
}

/// Application document persistence contract.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Inserts a new application.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicatePendingApplication`] when the
    /// worker already holds a pending application on the task.
    async fn store_application(&self, application: &Application) -> TaskRepositoryResult<()>;

    /// Replaces an application only if its stored status equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::ApplicationNotFound`] when missing and
    /// [`TaskRepositoryError::ApplicationConflict`] on a status mismatch.
    async fn update_application_if(
        &self,
        expected: ApplicationStatus,
        application: &Application,
    ) -> TaskRepositoryResult<()>;

    /// Finds an application by identifier.
    async fn find_application(
        &self,
        id: ApplicationId,
    ) -> TaskRepositoryResult<Option<Application>>;

    /// Returns all applications for a task, oldest first.
    async fn list_applications(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<Application>>;

    /// Finds the worker's pending application on a task, if any.
    async fn find_pending_application(
        &self,
        task_id: TaskId,
        worker: &UserId,
    ) -> TaskRepositoryResult<Option<Application>>;
}

/// Commission record persistence contract.
#[async_trait]
pub trait CommissionRepository: Send + Sync {
    /// Inserts a commission record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateCommission`] when the task
    /// already has a record.
    async fn store_commission(&self, record: &CommissionRecord) -> TaskRepositoryResult<()>;

    /// Finds the commission record for a task.
    async fn find_commission(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Option<CommissionRecord>>;
}

/// Errors returned by record store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The worker already has a pending application on the task.
    #[error("worker {worker} already has a pending application on task {task_id}")]
    DuplicatePendingApplication {
        /// Task identifier.
        task_id: TaskId,
        /// Applying worker.
        worker: UserId,
    },

    /// A commission record already exists for the task.
    #[error("commission already recorded for task {0}")]
    DuplicateCommission(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The application was not found.
    #[error("application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    /// The stored task no longer matches the expected prior state.
    #[error("task {task_id} changed concurrently: expected {expected}, found {actual}")]
    Conflict {
        /// Task identifier.
        task_id: TaskId,
        /// Expected prior status.
        expected: TaskStatus,
        /// Stored status.
        actual: TaskStatus,
    },

    /// The stored application no longer has the expected status.
    #[error("application {application_id} changed concurrently: expected {expected}, found {actual}")]
    ApplicationConflict {
        /// Application identifier.
        application_id: ApplicationId,
        /// Expected prior status.
        expected: ApplicationStatus,
        /// Stored status.
        actual: ApplicationStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
