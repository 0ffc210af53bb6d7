//! Best-effort notification delivery.
//!
//! Services never call the sink inline with a state change. They queue
//! [`domain::Notification`] values in an [`outbox::Outbox`] and dispatch it
//! only after the authoritative write has committed; delivery failures are
//! logged and dropped.

pub mod adapters;
pub mod domain;
pub mod outbox;
pub mod ports;

#[cfg(test)]
mod tests;
