//! Observability module for logging and metrics.
//!
//! Structured logging goes through `tracing`; counters and gauges go through
//! the `metrics` facade.

mod logging;
pub mod metrics;

pub use self::logging::{LoggingError, env_filter, init_logging};
pub use self::metrics::CommandOutcome;
