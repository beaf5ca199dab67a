//! Order Execution Bounded Context
//!
//! Orders owned by the execution engine, the events it reports about them,
//! and the classifier that maps command kinds to the events answering them.
//!
//! # Key Concepts
//!
//! - **Order**: Shared handle; only the engine changes its attributes
//! - **Order Events**: One multiplexed stream for every order and command
//! - **Classifier**: Done / rejected / informational event sets per command

pub mod aggregate;
pub mod classifier;
pub mod events;
pub mod value_objects;

pub use aggregate::{Order, OrderSnapshot, combined_signed_amount};
pub use classifier::{CommandKind, Resolution};
pub use events::{EventOrigin, OrderEvent, OrderEventKind};
pub use value_objects::{Direction, OrderSide, OrderState};
