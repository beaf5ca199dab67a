//! Application Services
//!
//! Long-lived objects that own shared state and wire the use cases together.

mod coordinator;

pub use coordinator::{CommandResult, OrderCoordinator};
