//! Merge Position Task
//!
//! Merges the filled orders of a position into one order. Stop-loss and
//! take-profit are cancelled on every order first, since the engine refuses
//! to merge orders with active protection. Orders being merged are marked
//! processing until the merge stream is dropped, so a concurrent batch does
//! not select them again.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{error, info};

use super::batch_change::BatchChangeTask;
use super::params::{MergeAllPositionsParams, MergePositionParams};
use crate::application::commands::{Command, CommandError, CommandExecutor};
use crate::application::compose::{
    Outcome, OutcomeStream, command_outcome, compose, concat, defer, parallel, with_hooks,
};
use crate::domain::order_execution::{CommandKind, Order, OrderState};
use crate::domain::position::PositionRegistry;
use crate::domain::shared::InstrumentId;

/// Merge orchestration over the position registry.
#[derive(Debug, Clone)]
pub struct MergePositionTask {
    executor: CommandExecutor,
    batch: BatchChangeTask,
    registry: Arc<PositionRegistry>,
}

impl MergePositionTask {
    /// Create a merge task.
    #[must_use]
    pub fn new(executor: CommandExecutor, registry: Arc<PositionRegistry>) -> Self {
        Self {
            batch: BatchChangeTask::new(executor.clone()),
            executor,
            registry,
        }
    }

    /// Cancel protection on `orders`, then merge them.
    ///
    /// Fewer than two orders need no merge and complete at once.
    #[must_use]
    pub fn merge(&self, orders: Vec<Order>, params: &MergePositionParams) -> OutcomeStream {
        if orders.len() < 2 {
            return with_hooks(stream::empty().boxed(), params.composition());
        }

        let cancels = compose(
            params.cancel_sltp_mode(),
            vec![
                self.batch.cancel_stop_loss(orders.clone(), params),
                self.batch.cancel_take_profit(orders.clone(), params),
            ],
        );
        let merge = command_outcome(
            &self.executor,
            Command::Merge {
                label: params.merge_label().to_string(),
                orders,
            },
            params.merge(),
            params.handlers(),
        );
        with_hooks(concat(cancels, merge), params.composition())
    }

    /// Merge the idle filled orders of `instrument`'s position.
    ///
    /// The orders are read when the stream is first polled.
    #[must_use]
    pub fn merge_position(&self, instrument: InstrumentId, params: MergePositionParams) -> OutcomeStream {
        let task = self.clone();
        defer(move || {
            let position = task.registry.for_instrument(&instrument);
            let guard = position.claim(|o| o.state() == OrderState::Filled);
            let orders = guard.orders().to_vec();
            info!(
                instrument = %instrument,
                orders = orders.len(),
                label = params.merge_label(),
                "Merging position"
            );
            traced("merge position", instrument, holding(task.merge(orders, &params), guard))
        })
    }

    /// Merge every known position, one instrument's failure not blocking
    /// the others. Invalid parameters for an instrument fail the run with
    /// `CommandError::InvalidParams`.
    #[must_use]
    pub fn merge_all_positions(&self, params: &MergeAllPositionsParams) -> OutcomeStream {
        let task = self.clone();
        let all = params.clone();
        let outcomes = defer(move || {
            let producers = task
                .registry
                .instruments()
                .into_iter()
                .map(|instrument| match all.for_instrument(&instrument) {
                    Ok(params) => task.merge_position(instrument, params),
                    Err(source) => {
                        error!(instrument = %instrument, error = %source, "Invalid merge parameters");
                        let failed: Outcome = Err(CommandError::InvalidParams {
                            kind: CommandKind::Merge,
                            instrument,
                            source,
                        });
                        stream::iter([failed]).boxed()
                    }
                })
                .collect();
            parallel(producers)
        });
        with_hooks(outcomes, params.composition())
    }
}

/// Keep `resource` alive until `outcomes` is dropped.
pub(super) fn holding<T: Send + 'static>(outcomes: OutcomeStream, resource: T) -> OutcomeStream {
    outcomes
        .map(move |outcome| {
            let _held = &resource;
            outcome
        })
        .boxed()
}

/// Log the terminal error of an orchestration.
pub(super) fn traced(
    operation: &'static str,
    instrument: InstrumentId,
    outcomes: OutcomeStream,
) -> OutcomeStream {
    outcomes
        .inspect(move |outcome| {
            if let Err(err) = outcome {
                error!(instrument = %instrument, operation, error = %err, "Orchestration failed");
            }
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::compose::{ComposeOptions, ComposeParams, run_to_completion};
    use crate::application::ports::{ExecutionEnginePort, OrderSpec};
    use crate::application::use_cases::MergePositionOptions;
    use crate::domain::order_execution::{CommandKind, OrderEventKind, OrderSide};
    use crate::infrastructure::broadcast::OrderEventHub;
    use crate::infrastructure::engine::PaperEngine;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        engine: Arc<PaperEngine>,
        registry: Arc<PositionRegistry>,
        task: MergePositionTask,
    }

    fn fixture() -> Fixture {
        let hub = Arc::new(OrderEventHub::new(64));
        let registry = Arc::new(PositionRegistry::new());
        hub.register_sink(registry.clone());
        let engine = Arc::new(PaperEngine::new(Arc::clone(&hub)));
        let executor = CommandExecutor::new(engine.clone(), hub);
        Fixture {
            engine,
            task: MergePositionTask::new(executor, Arc::clone(&registry)),
            registry,
        }
    }

    fn eurusd() -> InstrumentId {
        InstrumentId::new("EURUSD")
    }

    async fn open(engine: &PaperEngine, side: OrderSide, amount: Decimal) -> Order {
        let spec = OrderSpec::market(eurusd(), side, amount, "leg").with_stop_loss(dec!(1.0));
        engine.submit(spec).await.unwrap()
    }

    #[tokio::test]
    async fn merges_filled_orders_into_one() {
        let f = fixture();
        let a = open(&f.engine, OrderSide::Buy, dec!(0.3)).await;
        let b = open(&f.engine, OrderSide::Sell, dec!(0.1)).await;

        let events = run_to_completion(
            f.task
                .merge_position(eurusd(), MergePositionParams::labelled("Merged").unwrap()),
        )
        .await
        .unwrap();

        let merged = events.last().unwrap();
        assert_eq!(merged.kind(), OrderEventKind::MergeOk);
        assert!(a.is_closed() && b.is_closed());

        let position = f.registry.for_instrument(&eurusd());
        assert_eq!(position.all(), vec![merged.order().clone()]);
        assert_eq!(position.signed_exposure(), dec!(0.2));
        assert!(!position.is_processing(merged.order()));
    }

    #[tokio::test]
    async fn single_order_is_left_alone() {
        let f = fixture();
        open(&f.engine, OrderSide::Buy, dec!(0.1)).await;

        let events = run_to_completion(
            f.task
                .merge_position(eurusd(), MergePositionParams::labelled("Merged").unwrap()),
        )
        .await
        .unwrap();

        assert!(events.is_empty());
        assert_eq!(f.engine.call_count(CommandKind::SetStopLoss), 0);
        assert_eq!(f.engine.call_count(CommandKind::Merge), 0);
    }

    #[tokio::test]
    async fn failed_cancel_skips_the_merge_and_releases_orders() {
        let f = fixture();
        let a = open(&f.engine, OrderSide::Buy, dec!(0.1)).await;
        let b = open(&f.engine, OrderSide::Buy, dec!(0.1)).await;
        f.engine.reject_next(CommandKind::SetStopLoss, 1);

        let result = run_to_completion(
            f.task
                .merge_position(eurusd(), MergePositionParams::labelled("Merged").unwrap()),
        )
        .await;

        assert!(matches!(result, Err(ref e) if e.is_rejection()));
        assert_eq!(f.engine.call_count(CommandKind::Merge), 0);
        let position = f.registry.for_instrument(&eurusd());
        assert!(!position.is_processing(&a) && !position.is_processing(&b));
    }

    #[tokio::test]
    async fn retried_cancel_lets_the_merge_through() {
        let f = fixture();
        open(&f.engine, OrderSide::Buy, dec!(0.1)).await;
        open(&f.engine, OrderSide::Buy, dec!(0.2)).await;
        f.engine.reject_next(CommandKind::SetStopLoss, 1);
        let params = MergePositionParams::new(MergePositionOptions {
            merge_label: "Merged".to_string(),
            cancel_sl: ComposeParams::new(ComposeOptions {
                retry_count: 1,
                ..ComposeOptions::default()
            })
            .unwrap(),
            ..MergePositionOptions::default()
        })
        .unwrap();

        let events = run_to_completion(f.task.merge_position(eurusd(), params))
            .await
            .unwrap();

        assert_eq!(events.last().map(|e| e.kind()), Some(OrderEventKind::MergeOk));
        assert_eq!(f.engine.call_count(CommandKind::SetStopLoss), 3);
    }

    #[tokio::test]
    async fn merge_all_covers_every_instrument() {
        let f = fixture();
        for instrument in ["EURUSD", "GBPUSD"] {
            for _ in 0..2 {
                let spec = OrderSpec::market(InstrumentId::new(instrument), OrderSide::Buy, dec!(0.1), "leg");
                f.engine.submit(spec).await.unwrap();
            }
        }
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completed);
        let params = MergeAllPositionsParams::with_label_prefix(
            "MergePosition_",
            MergePositionParams::labelled("unused").unwrap(),
        )
        .with_composition(
            ComposeParams::new(ComposeOptions {
                on_complete: Some(Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
                ..ComposeOptions::default()
            })
            .unwrap(),
        );

        let events = run_to_completion(f.task.merge_all_positions(&params))
            .await
            .unwrap();

        assert_eq!(events.iter().filter(|e| e.kind() == OrderEventKind::MergeOk).count(), 2);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        for position in f.registry.all() {
            assert_eq!(position.size(), 1);
            assert!(position.all()[0].label().starts_with("MergePosition_"));
        }
    }

    #[tokio::test]
    async fn merge_all_reports_invalid_parameters() {
        let f = fixture();
        for instrument in ["EURUSD", "GBPUSD"] {
            for _ in 0..2 {
                let spec = OrderSpec::market(InstrumentId::new(instrument), OrderSide::Buy, dec!(0.1), "leg");
                f.engine.submit(spec).await.unwrap();
            }
        }
        let params = MergeAllPositionsParams::new(|instrument| {
            let label = if instrument.as_str() == "GBPUSD" { " " } else { "Merged" };
            MergePositionParams::labelled(label)
        });

        let result = run_to_completion(f.task.merge_all_positions(&params)).await;

        assert!(matches!(
            result,
            Err(CommandError::InvalidParams { ref instrument, .. }) if instrument.as_str() == "GBPUSD"
        ));
        for _ in 0..50 {
            if f.engine.call_count(CommandKind::Merge) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(f.registry.for_instrument(&InstrumentId::new("EURUSD")).size(), 1);
        assert_eq!(f.registry.for_instrument(&InstrumentId::new("GBPUSD")).size(), 2);
    }
}
