//! Compose Engine
//!
//! Parallel and sequential combination of command outcome producers, plus
//! the parameter bundles that configure one orchestration call.

mod engine;
mod params;

pub use crate::application::commands::{EventHandler, EventHandlers};
pub use engine::{
    Outcome, OutcomeStream, command_outcome, compose, concat, defer, parallel,
    run_to_completion, sequential, with_hooks,
};
pub use params::{ComposeOptions, ComposeParams, ConcurrencyMode, ErrorHook, Hook, ParamsError};
