//! Order state as reported by the execution engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an order on the engine side.
///
/// The engine owns these transitions; this crate only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Order created locally, not yet acknowledged.
    Created,
    /// Conditional order resting on the engine (not yet filled).
    Opened,
    /// Order filled and part of the exposure.
    Filled,
    /// Order closed (explicitly, by SL/TP, or by merge).
    Closed,
    /// Order canceled before it became live.
    Canceled,
}

impl OrderState {
    /// Returns true if the order can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Canceled)
    }

    /// Returns true if the order is live on the engine (opened or filled).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Opened | Self::Filled)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Opened => write!(f, "OPENED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Canceled => write!(f, "CANCELED"),
        }
    }
}
