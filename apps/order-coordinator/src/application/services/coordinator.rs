//! Order Coordinator
//!
//! The single object strategy code talks to. It owns the position registry
//! (registered as a sink on the event stream, so membership is current
//! before any command sees an event), the command executor, and the task
//! orchestrators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::commands::{Command, CommandError, CommandExecutor, RetryPolicy};
use crate::application::compose::{
    ComposeParams, EventHandlers, OutcomeStream, ParamsError, command_outcome, run_to_completion,
};
use crate::application::ports::{ExecutionEnginePort, OrderEventStream, OrderSpec};
use crate::application::use_cases::{
    BatchChangeTask, CloseAllPositionsParams, ClosePositionOptions, ClosePositionParams,
    ClosePositionTask, MergeAllPositionsParams, MergePositionOptions, MergePositionParams,
    MergePositionTask, SubmitAndMergeTask, merge_label,
};
use crate::config::OrchestrationConfig;
use crate::domain::order_execution::{Order, OrderEvent};
use crate::domain::position::{Position, PositionRegistry};
use crate::domain::shared::InstrumentId;

/// Result of a single command: the done event, or `None` when the order
/// already held the requested value.
pub type CommandResult = Result<Option<OrderEvent>, CommandError>;

/// Entry point for order operations.
#[derive(Debug, Clone)]
pub struct OrderCoordinator {
    registry: Arc<PositionRegistry>,
    executor: CommandExecutor,
    batch: BatchChangeTask,
    merge: MergePositionTask,
    close: ClosePositionTask,
    submit_and_merge: SubmitAndMergeTask,
    defaults: OrchestrationConfig,
    retry: RetryPolicy,
}

impl OrderCoordinator {
    /// Create a coordinator over `engine` and its event stream.
    pub fn new(
        engine: Arc<dyn ExecutionEnginePort>,
        events: Arc<dyn OrderEventStream>,
        defaults: OrchestrationConfig,
    ) -> Self {
        let registry = Arc::new(PositionRegistry::new());
        events.register_sink(registry.clone());
        let executor = CommandExecutor::new(engine, events);
        Self {
            batch: BatchChangeTask::new(executor.clone()),
            merge: MergePositionTask::new(executor.clone(), Arc::clone(&registry)),
            close: ClosePositionTask::new(executor.clone(), Arc::clone(&registry)),
            submit_and_merge: SubmitAndMergeTask::new(executor.clone(), Arc::clone(&registry)),
            registry,
            executor,
            defaults,
            retry: RetryPolicy::none(),
        }
    }

    /// Use `retry` for every command of the default orchestration params.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Position registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<PositionRegistry> {
        &self.registry
    }

    /// Position of `instrument`, created on first access.
    #[must_use]
    pub fn position(&self, instrument: &InstrumentId) -> Arc<Position> {
        self.registry.for_instrument(instrument)
    }

    /// Command executor.
    #[must_use]
    pub const fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Batch change task.
    #[must_use]
    pub const fn batch(&self) -> &BatchChangeTask {
        &self.batch
    }

    // Single commands

    /// Run one command under `params` with `handlers`.
    pub async fn execute(
        &self,
        command: Command,
        params: &ComposeParams,
        handlers: &EventHandlers,
    ) -> CommandResult {
        let mut events =
            run_to_completion(command_outcome(&self.executor, command, params, handlers)).await?;
        Ok(events.pop())
    }

    /// Submit a new order.
    pub async fn submit(&self, spec: OrderSpec, params: &ComposeParams) -> CommandResult {
        self.execute(Command::Submit(spec), params, &EventHandlers::new())
            .await
    }

    /// Merge `orders` into one order labelled `label`.
    pub async fn merge(&self, label: &str, orders: Vec<Order>, params: &ComposeParams) -> CommandResult {
        let command = Command::Merge {
            label: label.to_string(),
            orders,
        };
        self.execute(command, params, &EventHandlers::new()).await
    }

    /// Close an order.
    pub async fn close(&self, order: Order, params: &ComposeParams) -> CommandResult {
        self.execute(Command::Close(order), params, &EventHandlers::new())
            .await
    }

    /// Change the label.
    pub async fn set_label(&self, order: Order, label: &str, params: &ComposeParams) -> CommandResult {
        let command = Command::SetLabel {
            order,
            label: label.to_string(),
        };
        self.execute(command, params, &EventHandlers::new()).await
    }

    /// Change the good-till-time.
    pub async fn set_good_till_time(
        &self,
        order: Order,
        good_till_time: Option<DateTime<Utc>>,
        params: &ComposeParams,
    ) -> CommandResult {
        let command = Command::SetGoodTillTime {
            order,
            good_till_time,
        };
        self.execute(command, params, &EventHandlers::new()).await
    }

    /// Change the requested amount.
    pub async fn set_amount(&self, order: Order, amount: Decimal, params: &ComposeParams) -> CommandResult {
        self.execute(Command::SetAmount { order, amount }, params, &EventHandlers::new())
            .await
    }

    /// Change the open price.
    pub async fn set_open_price(
        &self,
        order: Order,
        price: Decimal,
        params: &ComposeParams,
    ) -> CommandResult {
        self.execute(Command::SetOpenPrice { order, price }, params, &EventHandlers::new())
            .await
    }

    /// Change the stop-loss; `None` cancels it.
    pub async fn set_stop_loss(
        &self,
        order: Order,
        price: Option<Decimal>,
        params: &ComposeParams,
    ) -> CommandResult {
        self.execute(Command::SetStopLoss { order, price }, params, &EventHandlers::new())
            .await
    }

    /// Change the take-profit; `None` cancels it.
    pub async fn set_take_profit(
        &self,
        order: Order,
        price: Option<Decimal>,
        params: &ComposeParams,
    ) -> CommandResult {
        self.execute(Command::SetTakeProfit { order, price }, params, &EventHandlers::new())
            .await
    }

    // Orchestrations

    /// Merge parameters for `instrument` from the configured defaults.
    ///
    /// Every command retries under the coordinator's retry policy.
    pub fn default_merge_params(&self, instrument: &InstrumentId) -> Result<MergePositionParams, ParamsError> {
        let commands = ComposeParams::with_retry_policy(self.retry.clone())?;
        MergePositionParams::new(MergePositionOptions {
            merge_label: merge_label(&self.defaults.merge_label_prefix, instrument),
            cancel_sl: commands.clone().in_mode(self.defaults.cancel_sl_mode),
            cancel_tp: commands.clone().in_mode(self.defaults.cancel_tp_mode),
            merge: commands,
            composition: ComposeParams::with_mode(self.defaults.cancel_sltp_mode),
            ..MergePositionOptions::default()
        })
    }

    /// Close parameters for `instrument` from the configured defaults.
    pub fn default_close_params(&self, instrument: &InstrumentId) -> Result<ClosePositionParams, ParamsError> {
        Ok(ClosePositionParams::new(ClosePositionOptions {
            merge: Some(self.default_merge_params(instrument)?),
            close: ComposeParams::with_retry_policy(self.retry.clone())?.in_mode(self.defaults.batch_mode),
            ..ClosePositionOptions::default()
        }))
    }

    /// Merge the filled orders of `instrument`'s position.
    #[must_use]
    pub fn merge_position(&self, instrument: InstrumentId, params: MergePositionParams) -> OutcomeStream {
        self.merge.merge_position(instrument, params)
    }

    /// Merge every known position.
    #[must_use]
    pub fn merge_all_positions(&self, params: &MergeAllPositionsParams) -> OutcomeStream {
        self.merge.merge_all_positions(params)
    }

    /// Close `instrument`'s position.
    #[must_use]
    pub fn close_position(&self, instrument: InstrumentId, params: ClosePositionParams) -> OutcomeStream {
        self.close.close_position(instrument, params)
    }

    /// Close every known position.
    #[must_use]
    pub fn close_all_positions(&self, params: &CloseAllPositionsParams) -> OutcomeStream {
        self.close.close_all_positions(params)
    }

    /// Submit an order, then merge its position.
    #[must_use]
    pub fn submit_and_merge(
        &self,
        spec: OrderSpec,
        submit: &ComposeParams,
        merge: MergePositionParams,
    ) -> OutcomeStream {
        self.submit_and_merge
            .submit_and_merge(spec, submit, &EventHandlers::new(), merge)
    }
}
