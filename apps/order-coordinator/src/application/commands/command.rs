//! Command: one engine call plus the kind that classifies its outcome.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::ports::OrderSpec;
use crate::domain::order_execution::{CommandKind, Order, OrderState};

/// A single unit of work against the execution engine.
///
/// Each variant carries the target and the requested value. Commands are
/// cheap to clone so a retry can re-issue a fresh copy.
#[derive(Debug, Clone)]
pub enum Command {
    /// Submit a new order.
    Submit(OrderSpec),
    /// Merge `orders` into one new order labelled `label`.
    Merge {
        /// Label of the merged order.
        label: String,
        /// Orders to merge.
        orders: Vec<Order>,
    },
    /// Close an order.
    Close(Order),
    /// Change the label.
    SetLabel {
        /// Target order.
        order: Order,
        /// New label.
        label: String,
    },
    /// Change the good-till-time; `None` means good-till-cancel.
    SetGoodTillTime {
        /// Target order.
        order: Order,
        /// New good-till-time.
        good_till_time: Option<DateTime<Utc>>,
    },
    /// Change the requested amount.
    SetAmount {
        /// Target order.
        order: Order,
        /// New unsigned amount.
        amount: Decimal,
    },
    /// Change the open price.
    SetOpenPrice {
        /// Target order.
        order: Order,
        /// New open price.
        price: Decimal,
    },
    /// Change the stop-loss; `None` cancels it.
    SetStopLoss {
        /// Target order.
        order: Order,
        /// New stop-loss price.
        price: Option<Decimal>,
    },
    /// Change the take-profit; `None` cancels it.
    SetTakeProfit {
        /// Target order.
        order: Order,
        /// New take-profit price.
        price: Option<Decimal>,
    },
}

impl Command {
    /// Cancel the stop-loss of `order`.
    #[must_use]
    pub const fn cancel_stop_loss(order: Order) -> Self {
        Self::SetStopLoss { order, price: None }
    }

    /// Cancel the take-profit of `order`.
    #[must_use]
    pub const fn cancel_take_profit(order: Order) -> Self {
        Self::SetTakeProfit { order, price: None }
    }

    /// Discriminant used for event classification.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Submit(_) => CommandKind::Submit,
            Self::Merge { .. } => CommandKind::Merge,
            Self::Close(_) => CommandKind::Close,
            Self::SetLabel { .. } => CommandKind::SetLabel,
            Self::SetGoodTillTime { .. } => CommandKind::SetGtt,
            Self::SetAmount { .. } => CommandKind::SetAmount,
            Self::SetOpenPrice { .. } => CommandKind::SetOpenPrice,
            Self::SetStopLoss { .. } => CommandKind::SetStopLoss,
            Self::SetTakeProfit { .. } => CommandKind::SetTakeProfit,
        }
    }

    /// Existing order this command acts on, if any.
    ///
    /// `None` for submit and merge, whose outcome belongs to a new order.
    #[must_use]
    pub const fn target_order(&self) -> Option<&Order> {
        match self {
            Self::Submit(_) | Self::Merge { .. } => None,
            Self::Close(order)
            | Self::SetLabel { order, .. }
            | Self::SetGoodTillTime { order, .. }
            | Self::SetAmount { order, .. }
            | Self::SetOpenPrice { order, .. }
            | Self::SetStopLoss { order, .. }
            | Self::SetTakeProfit { order, .. } => Some(order),
        }
    }

    /// Short description of the target for logs and errors.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::Submit(spec) => format!("submit '{}' on {}", spec.label, spec.instrument),
            Self::Merge { label, orders } => format!("merge '{label}' of {} orders", orders.len()),
            _ => self
                .target_order()
                .map_or_else(String::new, |order| order.id().to_string()),
        }
    }

    /// True if the target already holds the requested state, so issuing the
    /// call would be redundant.
    ///
    /// A close of a closed order and a merge of fewer than two orders count as
    /// already applied.
    #[must_use]
    pub fn is_already_applied(&self) -> bool {
        match self {
            Self::Submit(_) => false,
            Self::Merge { orders, .. } => orders.len() < 2,
            Self::Close(order) => order.state() == OrderState::Closed,
            Self::SetLabel { order, label } => order.label() == *label,
            Self::SetGoodTillTime {
                order,
                good_till_time,
            } => order.good_till_time() == *good_till_time,
            Self::SetAmount { order, amount } => order.amount() == *amount,
            Self::SetOpenPrice { order, price } => order.open_price() == Some(*price),
            Self::SetStopLoss { order, price } => order.stop_loss() == *price,
            Self::SetTakeProfit { order, price } => order.take_profit() == *price,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind(), self.target())
    }
}
