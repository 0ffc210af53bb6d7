//! In-memory adapters for tests and local deterministic flows.

mod store;

pub use store::InMemoryRecordStore;
