//! Shared wiring for in-memory integration tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gigflow::config::EngineConfig;
use gigflow::escrow::adapters::memory::InMemoryEscrowCustodian;
use gigflow::message::{
    adapters::memory::{InMemoryBlobStore, InMemoryMessageRepository},
    services::MessagingService,
};
use gigflow::notification::adapters::memory::InMemoryNotificationSink;
use gigflow::telemetry::{DEFAULT_DIRECTIVE, init_tracing};
use gigflow::task::{
    adapters::memory::InMemoryRecordStore,
    domain::{Application, Task, UserId},
    services::{ApplyRequest, CreateTaskRequest, TaskLifecycleService},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Lifecycle service wired to in-memory adapters.
pub type TestLifecycle = TaskLifecycleService<
    InMemoryRecordStore,
    InMemoryEscrowCustodian,
    InMemoryNotificationSink,
    DefaultClock,
>;

/// Messaging service sharing the lifecycle's record store.
pub type TestMessaging = MessagingService<
    InMemoryRecordStore,
    InMemoryMessageRepository,
    InMemoryBlobStore,
    InMemoryNotificationSink,
    DefaultClock,
>;

/// Identifier of the requester used throughout the suite.
pub const REQUESTER: &str = "requester-1";

/// Identifier of the configured administrator.
pub const ADMIN: &str = "ops-desk";

/// Both services plus handles on every adapter for inspection.
pub struct Marketplace {
    pub lifecycle: Arc<TestLifecycle>,
    pub messaging: TestMessaging,
    pub store: Arc<InMemoryRecordStore>,
    pub custodian: Arc<InMemoryEscrowCustodian>,
    pub sink: Arc<InMemoryNotificationSink>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub blobs: Arc<InMemoryBlobStore>,
}

/// Provides a marketplace with one administrator and default limits.
#[fixture]
pub fn marketplace() -> Marketplace {
    let _subscriber_installed = init_tracing(DEFAULT_DIRECTIVE);
    let config = EngineConfig {
        administrators: vec![ADMIN.to_owned()],
        external_call_timeout_ms: 250,
        ..EngineConfig::default()
    };
    let store = Arc::new(InMemoryRecordStore::new());
    let custodian = Arc::new(InMemoryEscrowCustodian::new());
    let sink = Arc::new(InMemoryNotificationSink::new());
    let messages = Arc::new(InMemoryMessageRepository::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let clock = Arc::new(DefaultClock);

    let lifecycle = TaskLifecycleService::new(
        Arc::clone(&store),
        Arc::clone(&custodian),
        Arc::clone(&sink),
        Arc::clone(&clock),
    )
    .with_config(&config)
    .expect("valid config");
    let messaging = MessagingService::new(
        Arc::clone(&store),
        Arc::clone(&messages),
        Arc::clone(&blobs),
        Arc::clone(&sink),
        clock,
    )
    .with_config(&config)
    .expect("valid config");

    Marketplace {
        lifecycle: Arc::new(lifecycle),
        messaging,
        store,
        custodian,
        sink,
        messages,
        blobs,
    }
}

/// Parses a user identifier.
///
/// # Panics
///
/// Panics on a blank identifier.
#[must_use]
pub fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

/// Builds a USDT posting with the given budget in minor units.
#[must_use]
pub fn posting(budget: u64) -> CreateTaskRequest {
    CreateTaskRequest::new(
        REQUESTER,
        "Assemble a bookshelf",
        "Flat-pack, five shelves, tools provided",
        budget,
        "USDT",
        Utc::now() + Duration::days(2),
    )
    .with_category("handyman")
}

impl Marketplace {
    /// Posts a task with a 100 USDT budget.
    ///
    /// # Errors
    ///
    /// Returns the service error when posting fails.
    pub async fn post(&self) -> eyre::Result<Task> {
        Ok(self.lifecycle.create_task(posting(100)).await?)
    }

    /// Submits an application carrying a payout address.
    ///
    /// # Errors
    ///
    /// Returns the service error when applying fails.
    pub async fn apply(&self, task: &Task, worker: &str) -> eyre::Result<Application> {
        Ok(self
            .lifecycle
            .apply(
                ApplyRequest::new(task.id(), worker)
                    .with_proposal("Can do it this afternoon")
                    .with_payout_address(format!("T-{worker}")),
            )
            .await?)
    }

    /// Posts a task, selects `worker` as the only applicant, and funds it.
    ///
    /// # Errors
    ///
    /// Returns the first service error encountered.
    pub async fn funded_task(&self, worker: &str) -> eyre::Result<Task> {
        let task = self.post().await?;
        let application = self.apply(&task, worker).await?;
        self.lifecycle
            .select_applicant(task.id(), application.id(), &user(REQUESTER))
            .await?;
        Ok(self
            .lifecycle
            .deposit_escrow(task.id(), &user(REQUESTER), None)
            .await?)
    }
}
