//! Close Position Task
//!
//! Closes a position: merge first when configured, then close whatever is
//! filled or opened once the merge finished.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::info;

use super::batch_change::BatchChangeTask;
use super::merge_position::{MergePositionTask, holding, traced};
use super::params::{CloseAllPositionsParams, ClosePositionParams};
use crate::application::commands::CommandExecutor;
use crate::application::compose::{OutcomeStream, concat, defer, parallel, with_hooks};
use crate::domain::position::PositionRegistry;
use crate::domain::shared::InstrumentId;

/// Close orchestration over the position registry.
#[derive(Debug, Clone)]
pub struct ClosePositionTask {
    batch: BatchChangeTask,
    merge: MergePositionTask,
    registry: Arc<PositionRegistry>,
}

impl ClosePositionTask {
    /// Create a close task.
    #[must_use]
    pub fn new(executor: CommandExecutor, registry: Arc<PositionRegistry>) -> Self {
        Self {
            batch: BatchChangeTask::new(executor.clone()),
            merge: MergePositionTask::new(executor, Arc::clone(&registry)),
            registry,
        }
    }

    /// Close `instrument`'s position.
    #[must_use]
    pub fn close_position(&self, instrument: InstrumentId, params: ClosePositionParams) -> OutcomeStream {
        let merge = match params.merge() {
            Some(merge_params) => self.merge.merge_position(instrument.clone(), merge_params.clone()),
            None => stream::empty().boxed(),
        };

        let task = self.clone();
        let close_params = params.clone();
        let target = instrument.clone();
        // Membership changes during the merge, so read it only afterwards.
        let close = defer(move || {
            let position = task.registry.for_instrument(&target);
            let guard = position.claim(|o| o.state().is_live());
            let orders = guard.orders().to_vec();
            info!(instrument = %target, orders = orders.len(), "Closing position");
            holding(task.batch.close(orders, &close_params), guard)
        });

        traced(
            "close position",
            instrument,
            with_hooks(concat(merge, close), params.composition()),
        )
    }

    /// Close every known position, one instrument's failure not blocking
    /// the others.
    #[must_use]
    pub fn close_all_positions(&self, params: &CloseAllPositionsParams) -> OutcomeStream {
        let task = self.clone();
        let all = params.clone();
        let outcomes = defer(move || {
            let producers = task
                .registry
                .instruments()
                .into_iter()
                .map(|instrument| {
                    let params = all.for_instrument(&instrument);
                    task.close_position(instrument, params)
                })
                .collect();
            parallel(producers)
        });
        with_hooks(outcomes, params.composition())
    }
}
