//! Command executor.
//!
//! One generic routine for every command kind: run the idempotence guard,
//! subscribe to the event stream, issue the engine call, then wait for the
//! first decisive event correlated by order identity and the classifier.
//! Dropping the returned future drops the subscription and nothing else.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::command::Command;
use super::error::CommandError;
use super::handlers::EventHandlers;
use crate::application::ports::{EngineError, ExecutionEnginePort, OrderEventStream};
use crate::domain::order_execution::classifier::{self, Resolution};
use crate::domain::order_execution::OrderEvent;
use crate::domain::shared::OrderId;
use crate::observability::CommandOutcome;
use crate::observability::metrics::{record_command_call, record_command_outcome};

/// Issues commands and resolves them from the order event stream.
#[derive(Clone)]
pub struct CommandExecutor {
    engine: Arc<dyn ExecutionEnginePort>,
    events: Arc<dyn OrderEventStream>,
}

impl CommandExecutor {
    /// Create an executor over an engine and its event stream.
    pub fn new(engine: Arc<dyn ExecutionEnginePort>, events: Arc<dyn OrderEventStream>) -> Self {
        Self { engine, events }
    }

    /// Execute `command` once.
    ///
    /// Returns `Ok(None)` when the guard finds the requested state already in
    /// place and no call is issued, `Ok(Some(event))` with the done event, or
    /// the error that resolved the command. Handlers run for every correlated
    /// event before this returns.
    pub async fn execute(
        &self,
        command: &Command,
        handlers: &EventHandlers,
    ) -> Result<Option<OrderEvent>, CommandError> {
        let kind = command.kind();

        if command.is_already_applied() {
            debug!(kind = %kind, target = %command.target(), "Command already applied, skipping call");
            record_command_outcome(kind, CommandOutcome::NoOp);
            return Ok(None);
        }

        // Subscribe first: the engine may report before the call returns.
        let mut events = self.events.subscribe();

        record_command_call(kind);
        let order_id = match self.issue(command).await {
            Ok(order_id) => order_id,
            Err(source) => {
                warn!(kind = %kind, target = %command.target(), error = %source, "Command call failed");
                record_command_outcome(kind, CommandOutcome::CallError);
                return Err(CommandError::Call {
                    kind,
                    target: command.target(),
                    source,
                });
            }
        };
        debug!(kind = %kind, order_id = %order_id, "Command issued, awaiting outcome");

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(kind = %kind, order_id = %order_id, skipped, "Event receiver lagged");
                    record_command_outcome(kind, CommandOutcome::StreamError);
                    return Err(CommandError::StreamLagged { kind, skipped });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    record_command_outcome(kind, CommandOutcome::StreamError);
                    return Err(CommandError::StreamClosed { kind });
                }
            };

            if !event.is_internal() || event.order_id() != &order_id {
                continue;
            }
            let Some(resolution) = classifier::resolve(kind, event.kind()) else {
                continue;
            };

            handlers.dispatch(&event);

            match resolution {
                Resolution::Done => {
                    debug!(kind = %kind, order_id = %order_id, event = %event.kind(), "Command done");
                    record_command_outcome(kind, CommandOutcome::Done);
                    return Ok(Some(event));
                }
                Resolution::Rejected => {
                    warn!(kind = %kind, order_id = %order_id, event = %event.kind(), "Command rejected");
                    record_command_outcome(kind, CommandOutcome::Rejected);
                    return Err(CommandError::Rejected {
                        kind,
                        order_id,
                        event_kind: event.kind(),
                    });
                }
                Resolution::Informational => {
                    debug!(kind = %kind, order_id = %order_id, event = %event.kind(), "Informational event");
                }
            }
        }
    }

    /// Issue the engine call; returns the order whose events answer it.
    async fn issue(&self, command: &Command) -> Result<OrderId, EngineError> {
        let engine = &self.engine;
        match command {
            Command::Submit(spec) => Ok(engine.submit(spec.clone()).await?.id().clone()),
            Command::Merge { label, orders } => Ok(engine.merge(label, orders).await?.id().clone()),
            Command::Close(order) => {
                engine.close(order).await?;
                Ok(order.id().clone())
            }
            Command::SetLabel { order, label } => {
                engine.set_label(order, label).await?;
                Ok(order.id().clone())
            }
            Command::SetGoodTillTime {
                order,
                good_till_time,
            } => {
                engine.set_good_till_time(order, *good_till_time).await?;
                Ok(order.id().clone())
            }
            Command::SetAmount { order, amount } => {
                engine.set_requested_amount(order, *amount).await?;
                Ok(order.id().clone())
            }
            Command::SetOpenPrice { order, price } => {
                engine.set_open_price(order, *price).await?;
                Ok(order.id().clone())
            }
            Command::SetStopLoss { order, price } => {
                engine.set_stop_loss_price(order, *price).await?;
                Ok(order.id().clone())
            }
            Command::SetTakeProfit { order, price } => {
                engine.set_take_profit_price(order, *price).await?;
                Ok(order.id().clone())
            }
        }
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor").finish_non_exhaustive()
    }
}
