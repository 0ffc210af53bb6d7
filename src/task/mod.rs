//! Task lifecycle engine for instant jobs.
//!
//! Requesters post tasks, workers apply, the requester selects one applicant,
//! funds the escrow, and approves the finished work, at which point the
//! custodian releases payment and a commission record is written. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
