//! Adapter implementations for the escrow custodian port.

pub mod memory;
