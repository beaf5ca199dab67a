//! Submit And Merge Task
//!
//! Submits an order and, once it is filled, merges it into the rest of its
//! instrument's position.

use std::sync::Arc;

use super::merge_position::MergePositionTask;
use super::params::MergePositionParams;
use crate::application::commands::{Command, CommandExecutor};
use crate::application::compose::{
    ComposeParams, EventHandlers, OutcomeStream, command_outcome, concat, with_hooks,
};
use crate::application::ports::OrderSpec;
use crate::domain::position::PositionRegistry;

/// Submit followed by a position merge.
#[derive(Debug, Clone)]
pub struct SubmitAndMergeTask {
    executor: CommandExecutor,
    merge: MergePositionTask,
}

impl SubmitAndMergeTask {
    /// Create the task.
    #[must_use]
    pub fn new(executor: CommandExecutor, registry: Arc<PositionRegistry>) -> Self {
        Self {
            merge: MergePositionTask::new(executor.clone(), registry),
            executor,
        }
    }

    /// Submit `spec` under `submit`, then merge its position under `merge`.
    ///
    /// A rejected submit ends the stream before any merge call.
    #[must_use]
    pub fn submit_and_merge(
        &self,
        spec: OrderSpec,
        submit: &ComposeParams,
        handlers: &EventHandlers,
        merge: MergePositionParams,
    ) -> OutcomeStream {
        let instrument = spec.instrument.clone();
        let composition = merge.composition().clone();
        let submitted = command_outcome(&self.executor, Command::Submit(spec), submit, handlers);
        let merged = self.merge.merge_position(instrument, merge);
        with_hooks(concat(submitted, merged), &composition)
    }
}
