//! Order Aggregate
//!
//! Handle to engine-owned orders and their last reported attributes.

mod order;

pub use order::{Order, OrderSnapshot, combined_signed_amount};
