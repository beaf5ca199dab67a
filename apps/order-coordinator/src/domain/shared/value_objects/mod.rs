//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.

mod identifiers;

pub use identifiers::{InstrumentId, OrderId};
