//! Gigflow: instant-job lifecycle and escrow orchestration.
//!
//! This crate owns the state machines for paid micro-tasks and their worker
//! applications, sequences value custody through an external escrow
//! custodian, keeps a per-task message log between requester and worker, and
//! emits best-effort notifications once state changes commit.
//!
//! # Architecture
//!
//! Gigflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory stores and
//!   fakes of the remote collaborators)
//!
//! # Modules
//!
//! - [`task`]: Task and application lifecycle, escrow sequencing, commission
//! - [`message`]: Per-task messaging channel with attachments
//! - [`escrow`]: Escrow custodian port
//! - [`notification`]: Notification sink port and post-commit outbox
//! - [`external`]: Timeout guard shared by every remote call
//! - [`config`]: Engine configuration
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod escrow;
pub mod external;
pub mod message;
pub mod notification;
pub mod task;
pub mod telemetry;
