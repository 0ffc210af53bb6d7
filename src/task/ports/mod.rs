//! Port contracts for the task lifecycle engine.
//!
//! Ports define infrastructure-agnostic interfaces used by task services. The
//! escrow custodian and notification sink ports live in their own modules.

pub mod repository;

pub use repository::{
    ApplicationRepository, CommissionRepository, TaskRepository, TaskRepositoryError,
    TaskRepositoryResult,
};
