//! Command errors.

use thiserror::Error;

use crate::application::compose::ParamsError;
use crate::application::ports::EngineError;
use crate::domain::order_execution::{CommandKind, OrderEventKind};
use crate::domain::shared::{InstrumentId, OrderId};

/// Failure of a single command execution.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The engine call failed before any event was produced.
    #[error("{kind} call failed for {target}: {source}")]
    Call {
        /// Command kind.
        kind: CommandKind,
        /// Description of the target.
        target: String,
        /// Engine error.
        #[source]
        source: EngineError,
    },

    /// The engine reported a rejection event.
    #[error("{kind} rejected for order {order_id} ({event_kind})")]
    Rejected {
        /// Command kind.
        kind: CommandKind,
        /// Order the rejection refers to.
        order_id: OrderId,
        /// Rejection event kind.
        event_kind: OrderEventKind,
    },

    /// The event stream ended before a decisive event.
    #[error("event stream closed while awaiting {kind} outcome")]
    StreamClosed {
        /// Command kind.
        kind: CommandKind,
    },

    /// The subscriber fell behind the event stream and lost events.
    #[error("event stream lagged by {skipped} events while awaiting {kind} outcome")]
    StreamLagged {
        /// Command kind.
        kind: CommandKind,
        /// Number of events lost.
        skipped: u64,
    },

    /// Parameters derived for one instrument of a whole-account run were
    /// invalid, so its commands were never issued.
    #[error("invalid {kind} parameters for {instrument}: {source}")]
    InvalidParams {
        /// Command kind the parameters were for.
        kind: CommandKind,
        /// Instrument whose parameters failed.
        instrument: InstrumentId,
        /// Validation error.
        #[source]
        source: ParamsError,
    },
}

impl CommandError {
    /// Kind of the failed command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Call { kind, .. }
            | Self::Rejected { kind, .. }
            | Self::StreamClosed { kind }
            | Self::StreamLagged { kind, .. }
            | Self::InvalidParams { kind, .. } => *kind,
        }
    }

    /// True if a retry may succeed. Only rejections are retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// True for a rejection event.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// True for a call-time failure.
    #[must_use]
    pub const fn is_call_error(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    /// Order involved in a rejection.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Rejected { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}
