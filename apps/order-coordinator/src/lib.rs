// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Order Coordinator - Rust Core Library
//!
//! Correlates fire-and-forget execution engine calls with the shared order
//! event stream and composes them into multi-order workflows.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Orders, events, and positions
//!   - `order_execution`: Order handle, event kinds, event classifier
//!   - `position`: Per-instrument position aggregate and its registry
//!
//! - **Application**: Commands and orchestration
//!   - `ports`: `ExecutionEnginePort`, `OrderEventStream`
//!   - `commands`: Command variants, executor, retry decorator
//!   - `compose`: Parallel and sequential outcome composition
//!   - `use_cases`: Merge, close, and submit-and-merge tasks
//!   - `services`: `OrderCoordinator`
//!
//! - **Infrastructure**: Adapters
//!   - `broadcast`: Order event hub
//!   - `engine`: Paper execution engine
//!
//! Cross-cutting: `config` (YAML configuration) and `observability`
//! (logging and metrics).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Commands, composition, and orchestration.
pub mod application;

/// Infrastructure layer - Adapters for the application ports.
pub mod infrastructure;

/// Configuration loading and validation.
pub mod config;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{
    CommandKind, Direction, Order, OrderEvent, OrderEventKind, OrderSide, OrderState,
};
pub use domain::position::{Position, PositionRegistry};
pub use domain::shared::{InstrumentId, OrderId};

// Application re-exports
pub use application::commands::{Command, CommandError, RetryPolicy};
pub use application::compose::{ComposeOptions, ComposeParams, ConcurrencyMode, EventHandlers};
pub use application::ports::{EngineError, ExecutionEnginePort, OrderEventStream, OrderSpec};
pub use application::services::OrderCoordinator;
pub use application::use_cases::{ClosePositionParams, MergePositionParams};

// Infrastructure re-exports
pub use infrastructure::broadcast::OrderEventHub;
pub use infrastructure::engine::PaperEngine;
