//! Adapter implementations for the messaging channel ports.

pub mod memory;
