//! Order Execution Value Objects

mod direction;
mod order_side;
mod order_state;

pub use direction::Direction;
pub use order_side::OrderSide;
pub use order_state::OrderState;
