//! Domain model for the instant-job lifecycle.
//!
//! Tasks, applications, and commission records are plain values; every
//! lifecycle rule lives here so that services only sequence persistence and
//! external calls around them.

mod application;
mod commission;
mod error;
mod ids;
mod money;
mod task;

pub use application::{Application, ApplicationStatus};
pub use commission::CommissionRecord;
pub use error::{ParseStatusError, TaskDomainError};
pub use ids::{ApplicationId, PayoutAddress, TaskId, UserId};
pub use money::{CommissionPercent, CommissionSplit, CurrencyCode, Money};
pub use task::{
    EscrowStatus, NewTask, PersistedTaskData, SelectedWorker, Task, TaskExpectation, TaskListing,
    TaskStatus,
};
