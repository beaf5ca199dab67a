//! Execution Engine Port (Driven Port)
//!
//! Interface for issuing order calls against the broker execution engine.
//! Every call is fire-and-forget: `Ok` only means the engine accepted the
//! request. The outcome arrives later on the order event stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::{Order, OrderSide};
use crate::domain::shared::InstrumentId;

/// Parameters of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Instrument to trade.
    pub instrument: InstrumentId,
    /// Order side.
    pub side: OrderSide,
    /// Unsigned amount.
    pub amount: Decimal,
    /// Strategy label.
    pub label: String,
    /// Open price; `Some` makes the order conditional.
    pub open_price: Option<Decimal>,
    /// Initial stop-loss.
    pub stop_loss: Option<Decimal>,
    /// Initial take-profit.
    pub take_profit: Option<Decimal>,
    /// Good-till-time for conditional orders.
    pub good_till_time: Option<DateTime<Utc>>,
}

impl OrderSpec {
    /// Create a market order spec.
    #[must_use]
    pub fn market(
        instrument: InstrumentId,
        side: OrderSide,
        amount: Decimal,
        label: impl Into<String>,
    ) -> Self {
        Self {
            instrument,
            side,
            amount,
            label: label.into(),
            open_price: None,
            stop_loss: None,
            take_profit: None,
            good_till_time: None,
        }
    }

    /// Create a conditional order spec resting at `open_price`.
    #[must_use]
    pub fn conditional(
        instrument: InstrumentId,
        side: OrderSide,
        amount: Decimal,
        label: impl Into<String>,
        open_price: Decimal,
    ) -> Self {
        Self {
            open_price: Some(open_price),
            ..Self::market(instrument, side, amount, label)
        }
    }

    /// Set the initial stop-loss.
    #[must_use]
    pub const fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Set the initial take-profit.
    #[must_use]
    pub const fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Set the good-till-time.
    #[must_use]
    pub const fn with_good_till_time(mut self, gtt: DateTime<Utc>) -> Self {
        self.good_till_time = Some(gtt);
        self
    }

    /// True if the order rests until its open price is reached.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        self.open_price.is_some()
    }
}

/// Call-time failure of an engine request, raised before any event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Connection error.
    #[error("Engine connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// Request refused before submission.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error details.
        message: String,
    },

    /// Order not known to the engine.
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order ID.
        order_id: String,
    },

    /// Unknown error.
    #[error("Engine error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for execution engine calls.
#[async_trait]
pub trait ExecutionEnginePort: Send + Sync {
    /// Submit a new order. Returns the engine's handle for it.
    async fn submit(&self, spec: OrderSpec) -> Result<Order, EngineError>;

    /// Merge `orders` into one new order labelled `label`.
    async fn merge(&self, label: &str, orders: &[Order]) -> Result<Order, EngineError>;

    /// Close an order.
    async fn close(&self, order: &Order) -> Result<(), EngineError>;

    /// Change the label.
    async fn set_label(&self, order: &Order, label: &str) -> Result<(), EngineError>;

    /// Change the good-till-time.
    async fn set_good_till_time(
        &self,
        order: &Order,
        gtt: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError>;

    /// Change the requested amount.
    async fn set_requested_amount(&self, order: &Order, amount: Decimal)
    -> Result<(), EngineError>;

    /// Change the open price.
    async fn set_open_price(&self, order: &Order, price: Decimal) -> Result<(), EngineError>;

    /// Change the stop-loss; `None` cancels it.
    async fn set_stop_loss_price(
        &self,
        order: &Order,
        price: Option<Decimal>,
    ) -> Result<(), EngineError>;

    /// Change the take-profit; `None` cancels it.
    async fn set_take_profit_price(
        &self,
        order: &Order,
        price: Option<Decimal>,
    ) -> Result<(), EngineError>;
}
