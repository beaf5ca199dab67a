//! Batch Change Task
//!
//! Applies one kind of change to a set of orders and combines the per-order
//! outcomes under the concurrency mode of the command parameters.

use tracing::debug;

use super::params::{ClosePositionParams, MergePositionParams};
use crate::application::commands::{Command, CommandExecutor};
use crate::application::compose::{
    ComposeParams, EventHandlers, OutcomeStream, command_outcome, compose,
};
use crate::domain::order_execution::Order;

/// Per-order batch operations.
#[derive(Debug, Clone)]
pub struct BatchChangeTask {
    executor: CommandExecutor,
}

impl BatchChangeTask {
    /// Create a batch task over `executor`.
    #[must_use]
    pub const fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Close every order.
    #[must_use]
    pub fn close(&self, orders: Vec<Order>, params: &ClosePositionParams) -> OutcomeStream {
        debug!(orders = orders.len(), mode = ?params.close_mode(), "Batch close");
        self.batch(
            orders,
            Command::Close,
            params.close(),
            params.handlers(),
        )
    }

    /// Cancel the stop-loss of every order.
    #[must_use]
    pub fn cancel_stop_loss(&self, orders: Vec<Order>, params: &MergePositionParams) -> OutcomeStream {
        debug!(orders = orders.len(), mode = ?params.cancel_sl_mode(), "Batch cancel stop-loss");
        self.batch(
            orders,
            Command::cancel_stop_loss,
            params.cancel_sl(),
            params.handlers(),
        )
    }

    /// Cancel the take-profit of every order.
    #[must_use]
    pub fn cancel_take_profit(
        &self,
        orders: Vec<Order>,
        params: &MergePositionParams,
    ) -> OutcomeStream {
        debug!(orders = orders.len(), mode = ?params.cancel_tp_mode(), "Batch cancel take-profit");
        self.batch(
            orders,
            Command::cancel_take_profit,
            params.cancel_tp(),
            params.handlers(),
        )
    }

    fn batch(
        &self,
        orders: Vec<Order>,
        command: impl Fn(Order) -> Command,
        params: &ComposeParams,
        handlers: &EventHandlers,
    ) -> OutcomeStream {
        let producers = orders
            .into_iter()
            .map(|order| command_outcome(&self.executor, command(order), params, handlers))
            .collect();
        compose(params.concurrency_mode(), producers)
    }
}
