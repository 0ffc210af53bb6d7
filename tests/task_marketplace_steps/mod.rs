//! Step definitions for marketplace behaviour scenarios.

mod given;
pub mod world;
