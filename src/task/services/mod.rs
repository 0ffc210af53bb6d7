//! Application services for task lifecycle orchestration.

mod error;
mod lifecycle;
mod notices;
mod requests;
mod settlement;

pub use error::{TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::TaskLifecycleService;
pub use requests::{ApplyRequest, CreateTaskRequest, ReconciliationReport, Selection};
