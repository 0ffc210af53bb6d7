//! Escrow custodian integration.
//!
//! The custodian holds task budgets in trust between deposit and release or
//! refund. Its internals are opaque; the engine only relies on the idempotent,
//! task-keyed contract in [`ports`].

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
