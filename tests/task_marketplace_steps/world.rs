//! Shared world state for marketplace BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use gigflow::escrow::adapters::memory::InMemoryEscrowCustodian;
use gigflow::notification::adapters::memory::InMemoryNotificationSink;
use gigflow::task::{
    adapters::memory::InMemoryRecordStore,
    domain::{Application, Task, UserId},
    services::{Selection, TaskLifecycleError, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestLifecycle = TaskLifecycleService<
    InMemoryRecordStore,
    InMemoryEscrowCustodian,
    InMemoryNotificationSink,
    DefaultClock,
>;

/// Requester identity shared by every scenario.
pub const REQUESTER: &str = "requester-1";

/// Scenario world for marketplace behaviour tests.
pub struct MarketplaceWorld {
    pub service: Arc<TestLifecycle>,
    pub store: Arc<InMemoryRecordStore>,
    pub custodian: Arc<InMemoryEscrowCustodian>,
    pub task: Option<Task>,
    pub applications: HashMap<String, Application>,
    pub last_apply: Option<Result<Application, TaskLifecycleError>>,
    pub last_result: Option<Result<Task, TaskLifecycleError>>,
    pub selections: Vec<Result<Selection, TaskLifecycleError>>,
}

impl MarketplaceWorld {
    /// Creates a world backed by fresh in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let custodian = Arc::new(InMemoryEscrowCustodian::new());
        let service = TaskLifecycleService::new(
            Arc::clone(&store),
            Arc::clone(&custodian),
            Arc::new(InMemoryNotificationSink::new()),
            Arc::new(DefaultClock),
        );

        Self {
            service: Arc::new(service),
            store,
            custodian,
            task: None,
            applications: HashMap::new(),
            last_apply: None,
            last_result: None,
            selections: Vec::new(),
        }
    }

    /// Returns the scenario's task.
    ///
    /// # Errors
    ///
    /// Returns an error when no task was posted yet.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Returns the application submitted by `worker`.
    ///
    /// # Errors
    ///
    /// Returns an error when the worker has not applied.
    pub fn application_of(&self, worker: &str) -> Result<&Application, eyre::Report> {
        self.applications
            .get(worker)
            .ok_or_else(|| eyre::eyre!("worker {worker} has not applied"))
    }
}

impl Default for MarketplaceWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> MarketplaceWorld {
    MarketplaceWorld::default()
}

/// Parses a user identifier from scenario text.
///
/// # Errors
///
/// Returns an error for a blank identifier.
pub fn user(id: &str) -> Result<UserId, eyre::Report> {
    Ok(UserId::new(id)?)
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
