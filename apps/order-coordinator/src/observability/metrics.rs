//! Metrics for command coordination.
//!
//! Recorded through the `metrics` facade. Installing an exporter is up to the
//! embedding application; without one every call is a no-op.

use metrics::{counter, gauge};

use crate::domain::order_execution::{CommandKind, OrderEventKind};
use crate::domain::position::MembershipChange;
use crate::domain::shared::InstrumentId;

/// Terminal outcome of one command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A done event resolved the command.
    Done,
    /// A reject event resolved the command.
    Rejected,
    /// The engine call failed before any event.
    CallError,
    /// The order already held the requested state.
    NoOp,
    /// The event stream closed or lagged.
    StreamError,
}

impl CommandOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::CallError => "call_error",
            Self::NoOp => "no_op",
            Self::StreamError => "stream_error",
        }
    }
}

// ============================================================================
// Command Metrics
// ============================================================================

/// Record an engine call issued for a command.
pub fn record_command_call(kind: CommandKind) {
    counter!("order_command_calls_total", "kind" => kind.as_str()).increment(1);
}

/// Record the terminal outcome of a command execution.
pub fn record_command_outcome(kind: CommandKind, outcome: CommandOutcome) {
    counter!(
        "order_command_outcomes_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a retry scheduled after a rejection.
pub fn record_command_retry(kind: CommandKind, rejected_by: OrderEventKind) {
    counter!(
        "order_command_retries_total",
        "kind" => kind.as_str(),
        "event" => rejected_by.as_str()
    )
    .increment(1);
}

// ============================================================================
// Position Metrics
// ============================================================================

/// Record a position membership change and the resulting size.
pub fn record_membership_change(instrument: &InstrumentId, change: MembershipChange, size: usize) {
    let label = match change {
        MembershipChange::Added => "added",
        MembershipChange::Removed => "removed",
        MembershipChange::Unchanged => return,
    };
    counter!(
        "position_membership_changes_total",
        "instrument" => instrument.to_string(),
        "change" => label
    )
    .increment(1);
    gauge!("position_orders", "instrument" => instrument.to_string()).set(size as f64);
}
