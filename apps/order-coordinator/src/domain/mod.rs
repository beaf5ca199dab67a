//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Order handles and per-instrument positions
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Events**: Engine-reported order outcomes
//! - **Classifier**: Static metadata correlating commands with events
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Orders, order events and the event classifier
//! - [`position`]: Position membership and the position registry

pub mod order_execution;
pub mod position;
pub mod shared;
