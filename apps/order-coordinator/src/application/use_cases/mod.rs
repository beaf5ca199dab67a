//! Task Orchestrators
//!
//! Multi-step order operations built from commands and the compose engine.
//! Every orchestrator returns a lazy outcome stream: nothing is issued until
//! the stream is polled, and the stream carries exactly one terminal signal.

mod batch_change;
mod close_position;
mod merge_position;
mod params;
mod submit_and_merge;

pub use batch_change::BatchChangeTask;
pub use close_position::ClosePositionTask;
pub use merge_position::MergePositionTask;
pub use params::{
    CloseAllPositionsParams, ClosePositionOptions, ClosePositionParams, MergeAllPositionsParams,
    MergePositionOptions, MergePositionParams, merge_label,
};
pub use submit_and_merge::SubmitAndMergeTask;
