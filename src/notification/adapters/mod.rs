//! Adapter implementations for the notification sink port.

pub mod memory;
