//! Paper execution engine.
//!
//! In-process stand-in for a broker execution engine. Calls return as soon as
//! the request is accepted; the outcome is published on the order event hub,
//! either before the call returns (default) or after a configured latency.
//! Scripting helpers let tests reject, mute, or fail individual calls and
//! trigger engine-side closes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::application::ports::{EngineError, ExecutionEnginePort, OrderSpec};
use crate::domain::order_execution::{
    CommandKind, Order, OrderEvent, OrderEventKind, OrderSide, OrderSnapshot, OrderState,
    combined_signed_amount,
};
use crate::domain::shared::{InstrumentId, OrderId};
use crate::infrastructure::broadcast::OrderEventHub;

type SnapshotUpdate = Box<dyn FnOnce(&mut OrderSnapshot) + Send>;

/// One event to publish, with the snapshot change that precedes it.
struct Emission {
    order: Order,
    kind: OrderEventKind,
    update: Option<SnapshotUpdate>,
}

impl Emission {
    fn new(order: &Order, kind: OrderEventKind) -> Self {
        Self {
            order: order.clone(),
            kind,
            update: None,
        }
    }

    fn with_update(mut self, update: impl FnOnce(&mut OrderSnapshot) + Send + 'static) -> Self {
        self.update = Some(Box::new(update));
        self
    }

    fn with_state(self, state: OrderState) -> Self {
        self.with_update(move |s| s.state = state)
    }
}

/// What to do with an accepted call.
enum Disposition {
    Accept,
    Reject,
    Mute,
}

#[derive(Default)]
struct PaperState {
    next_id: u64,
    orders: HashMap<OrderId, Order>,
    calls: HashMap<CommandKind, usize>,
    rejects: HashMap<CommandKind, usize>,
    mutes: HashMap<CommandKind, usize>,
    failures: HashMap<CommandKind, usize>,
}

impl PaperState {
    fn next_order_id(&mut self) -> OrderId {
        self.next_id += 1;
        OrderId::new(format!("paper-{}", self.next_id))
    }

    fn take_scripted(counts: &mut HashMap<CommandKind, usize>, kind: CommandKind) -> bool {
        match counts.get_mut(&kind) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    /// Count the call and decide its fate.
    fn begin(&mut self, kind: CommandKind) -> Result<Disposition, EngineError> {
        *self.calls.entry(kind).or_default() += 1;
        if Self::take_scripted(&mut self.failures, kind) {
            return Err(EngineError::Connection {
                message: format!("scripted {kind} failure"),
            });
        }
        if Self::take_scripted(&mut self.mutes, kind) {
            return Ok(Disposition::Mute);
        }
        if Self::take_scripted(&mut self.rejects, kind) {
            return Ok(Disposition::Reject);
        }
        Ok(Disposition::Accept)
    }

    fn known(&self, order: &Order) -> Result<Order, EngineError> {
        self.orders
            .get(order.id())
            .cloned()
            .ok_or_else(|| EngineError::OrderNotFound {
                order_id: order.id().to_string(),
            })
    }
}

/// In-process execution engine publishing to an [`OrderEventHub`].
pub struct PaperEngine {
    hub: Arc<OrderEventHub>,
    state: Mutex<PaperState>,
    latency: Option<Duration>,
}

impl PaperEngine {
    /// Create an engine that reports before each call returns.
    #[must_use]
    pub fn new(hub: Arc<OrderEventHub>) -> Self {
        Self {
            hub,
            state: Mutex::new(PaperState::default()),
            latency: None,
        }
    }

    /// Report outcomes on a background task after `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject the next `n` calls of `kind`.
    pub fn reject_next(&self, kind: CommandKind, n: usize) {
        *self.state.lock().rejects.entry(kind).or_default() += n;
    }

    /// Accept the next `n` calls of `kind` without reporting anything.
    pub fn mute_next(&self, kind: CommandKind, n: usize) {
        *self.state.lock().mutes.entry(kind).or_default() += n;
    }

    /// Fail the next call of `kind` with a connection error.
    pub fn fail_next_call(&self, kind: CommandKind) {
        *self.state.lock().failures.entry(kind).or_default() += 1;
    }

    /// Calls of `kind` received so far, failed ones included.
    #[must_use]
    pub fn call_count(&self, kind: CommandKind) -> usize {
        self.state.lock().calls.get(&kind).copied().unwrap_or(0)
    }

    /// Look up an order by identity.
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.state.lock().orders.get(id).cloned()
    }

    /// Fill a resting conditional order.
    pub fn fill(&self, order: &Order) {
        self.emit_now(vec![
            Emission::new(order, OrderEventKind::FullyFilled).with_state(OrderState::Filled),
        ]);
    }

    /// Close an order as if its stop-loss was hit.
    pub fn trigger_stop_loss(&self, order: &Order) {
        self.emit_now(vec![
            Emission::new(order, OrderEventKind::ClosedBySl).with_state(OrderState::Closed),
        ]);
    }

    /// Close an order as if its take-profit was hit.
    pub fn trigger_take_profit(&self, order: &Order) {
        self.emit_now(vec![
            Emission::new(order, OrderEventKind::ClosedByTp).with_state(OrderState::Closed),
        ]);
    }

    /// Publish an internal notification for `order`.
    pub fn notify(&self, order: &Order) {
        self.publish_internal(order, OrderEventKind::Notification);
    }

    /// Publish an internal event without touching the order.
    pub fn publish_internal(&self, order: &Order, kind: OrderEventKind) {
        self.hub.publish(OrderEvent::internal(order.clone(), kind));
    }

    /// Publish an event for an order owned by another strategy.
    pub fn publish_external(&self, order: &Order, kind: OrderEventKind) {
        self.hub.publish(OrderEvent::external(order.clone(), kind));
    }

    fn emit_now(&self, emissions: Vec<Emission>) {
        publish_all(&self.hub, emissions);
    }

    /// Report the outcome of an accepted call.
    fn report(&self, emissions: Vec<Emission>) {
        match self.latency {
            None => self.emit_now(emissions),
            Some(latency) => {
                let hub = Arc::clone(&self.hub);
                tokio::spawn(async move {
                    tokio::time::sleep(latency).await;
                    publish_all(&hub, emissions);
                });
            }
        }
    }

    /// Shared path of the single-order change calls.
    fn change(
        &self,
        kind: CommandKind,
        order: &Order,
        done: OrderEventKind,
        rejected: OrderEventKind,
        update: impl FnOnce(&mut OrderSnapshot) + Send + 'static,
    ) -> Result<(), EngineError> {
        let (order, disposition) = {
            let mut state = self.state.lock();
            let disposition = state.begin(kind)?;
            (state.known(order)?, disposition)
        };
        debug!(kind = %kind, order_id = %order.id(), "Paper change accepted");
        match disposition {
            Disposition::Accept => self.report(vec![Emission::new(&order, done).with_update(update)]),
            Disposition::Reject => self.report(vec![Emission::new(&order, rejected)]),
            Disposition::Mute => {}
        }
        Ok(())
    }
}

fn publish_all(hub: &OrderEventHub, emissions: Vec<Emission>) {
    for emission in emissions {
        if let Some(update) = emission.update {
            emission.order.update(update);
        }
        hub.publish(OrderEvent::internal(emission.order, emission.kind));
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidRequest {
        message: message.into(),
    }
}

#[async_trait]
impl ExecutionEnginePort for PaperEngine {
    async fn submit(&self, spec: OrderSpec) -> Result<Order, EngineError> {
        let (order, disposition) = {
            let mut state = self.state.lock();
            let disposition = state.begin(CommandKind::Submit)?;
            if spec.amount <= Decimal::ZERO {
                return Err(invalid(format!("amount must be positive, got {}", spec.amount)));
            }
            let id = state.next_order_id();
            let snapshot = OrderSnapshot {
                open_price: spec.open_price,
                stop_loss: spec.stop_loss,
                take_profit: spec.take_profit,
                good_till_time: spec.good_till_time,
                ..OrderSnapshot::created(spec.label.clone(), spec.amount)
            };
            let order = Order::new(id.clone(), spec.instrument.clone(), spec.side, snapshot);
            state.orders.insert(id, order.clone());
            (order, disposition)
        };
        debug!(order_id = %order.id(), instrument = %order.instrument(), side = %order.side(), amount = %order.amount(), "Paper order submitted");

        match disposition {
            Disposition::Accept if spec.is_conditional() => self.report(vec![
                Emission::new(&order, OrderEventKind::SubmitConditionalOk)
                    .with_state(OrderState::Opened),
            ]),
            Disposition::Accept => self.report(vec![
                Emission::new(&order, OrderEventKind::SubmitOk).with_state(OrderState::Opened),
                Emission::new(&order, OrderEventKind::FullyFilled).with_state(OrderState::Filled),
            ]),
            Disposition::Reject => self.report(vec![
                Emission::new(&order, OrderEventKind::SubmitRejected)
                    .with_state(OrderState::Canceled),
            ]),
            Disposition::Mute => {}
        }
        Ok(order)
    }

    async fn merge(&self, label: &str, orders: &[Order]) -> Result<Order, EngineError> {
        let (merged, sources, disposition) = {
            let mut state = self.state.lock();
            let disposition = state.begin(CommandKind::Merge)?;
            if orders.len() < 2 {
                return Err(invalid("merge needs at least two orders"));
            }
            let sources = orders
                .iter()
                .map(|o| state.known(o))
                .collect::<Result<Vec<_>, _>>()?;
            let instrument: &InstrumentId = sources[0].instrument();
            if sources.iter().any(|o| o.instrument() != instrument) {
                return Err(invalid("merge orders must share one instrument"));
            }
            if sources.iter().any(|o| !o.is_filled()) {
                return Err(invalid("merge orders must be filled"));
            }

            let net = combined_signed_amount(&sources);
            let id = state.next_order_id();
            let merged = Order::new(
                id.clone(),
                instrument.clone(),
                OrderSide::from_signed(net),
                OrderSnapshot::created(label, net.abs()),
            );
            state.orders.insert(id, merged.clone());
            (merged, sources, disposition)
        };
        debug!(order_id = %merged.id(), sources = sources.len(), amount = %merged.signed_amount(), "Paper merge accepted");

        match disposition {
            Disposition::Accept => {
                let mut emissions: Vec<Emission> = sources
                    .iter()
                    .map(|o| {
                        Emission::new(o, OrderEventKind::ClosedByMerge).with_state(OrderState::Closed)
                    })
                    .collect();
                emissions.push(if merged.amount().is_zero() {
                    Emission::new(&merged, OrderEventKind::MergeCloseOk)
                        .with_state(OrderState::Closed)
                } else {
                    Emission::new(&merged, OrderEventKind::MergeOk).with_state(OrderState::Filled)
                });
                self.report(emissions);
            }
            Disposition::Reject => self.report(vec![
                Emission::new(&merged, OrderEventKind::MergeRejected)
                    .with_state(OrderState::Canceled),
            ]),
            Disposition::Mute => {}
        }
        Ok(merged)
    }

    async fn close(&self, order: &Order) -> Result<(), EngineError> {
        let (order, disposition) = {
            let mut state = self.state.lock();
            let disposition = state.begin(CommandKind::Close)?;
            let order = state.known(order)?;
            if order.is_closed() {
                return Err(invalid(format!("order {} already closed", order.id())));
            }
            (order, disposition)
        };
        debug!(order_id = %order.id(), "Paper close accepted");

        match disposition {
            Disposition::Accept => self.report(vec![
                Emission::new(&order, OrderEventKind::CloseOk).with_state(OrderState::Closed),
            ]),
            Disposition::Reject => {
                self.report(vec![Emission::new(&order, OrderEventKind::CloseRejected)]);
            }
            Disposition::Mute => {}
        }
        Ok(())
    }

    async fn set_label(&self, order: &Order, label: &str) -> Result<(), EngineError> {
        let label = label.to_string();
        self.change(
            CommandKind::SetLabel,
            order,
            OrderEventKind::ChangedLabel,
            OrderEventKind::ChangeLabelRejected,
            move |s| s.label = label,
        )
    }

    async fn set_good_till_time(
        &self,
        order: &Order,
        gtt: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        self.change(
            CommandKind::SetGtt,
            order,
            OrderEventKind::ChangedGtt,
            OrderEventKind::ChangeGttRejected,
            move |s| s.good_till_time = gtt,
        )
    }

    async fn set_requested_amount(
        &self,
        order: &Order,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        if amount <= Decimal::ZERO {
            return Err(invalid(format!("amount must be positive, got {amount}")));
        }
        self.change(
            CommandKind::SetAmount,
            order,
            OrderEventKind::ChangedAmount,
            OrderEventKind::ChangeAmountRejected,
            move |s| s.amount = amount,
        )
    }

    async fn set_open_price(&self, order: &Order, price: Decimal) -> Result<(), EngineError> {
        self.change(
            CommandKind::SetOpenPrice,
            order,
            OrderEventKind::ChangedPrice,
            OrderEventKind::ChangePriceRejected,
            move |s| s.open_price = Some(price),
        )
    }

    async fn set_stop_loss_price(
        &self,
        order: &Order,
        price: Option<Decimal>,
    ) -> Result<(), EngineError> {
        self.change(
            CommandKind::SetStopLoss,
            order,
            OrderEventKind::ChangedSl,
            OrderEventKind::ChangeSlRejected,
            move |s| s.stop_loss = price,
        )
    }

    async fn set_take_profit_price(
        &self,
        order: &Order,
        price: Option<Decimal>,
    ) -> Result<(), EngineError> {
        self.change(
            CommandKind::SetTakeProfit,
            order,
            OrderEventKind::ChangedTp,
            OrderEventKind::ChangeTpRejected,
            move |s| s.take_profit = price,
        )
    }
}

impl std::fmt::Debug for PaperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperEngine")
            .field("orders", &self.state.lock().orders.len())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}
