//! Position Bounded Context
//!
//! Per-instrument order membership driven by the order event stream, and the
//! registry that owns one position per instrument.

mod aggregate;
mod registry;

pub use aggregate::{MembershipChange, Position, ProcessingGuard};
pub use registry::PositionRegistry;
