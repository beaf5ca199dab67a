//! Commands
//!
//! A command is one engine call correlated to the first decisive event that
//! answers it. The executor is the single generic routine for every kind;
//! the retry decorator re-issues rejected commands.

mod command;
mod error;
mod executor;
mod handlers;
mod retry;

pub use crate::domain::order_execution::CommandKind;
pub use command::Command;
pub use error::CommandError;
pub use executor::CommandExecutor;
pub use handlers::{EventHandler, EventHandlers};
pub use retry::{RetryPolicy, execute_with_retries};
