//! Net direction of a set of orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Net direction derived from a signed exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Positive net exposure.
    Long,
    /// Negative net exposure.
    Short,
    /// No net exposure.
    Flat,
}

impl Direction {
    /// Direction of a signed exposure.
    #[must_use]
    pub fn from_exposure(exposure: Decimal) -> Self {
        if exposure.is_zero() {
            Self::Flat
        } else if exposure.is_sign_positive() {
            Self::Long
        } else {
            Self::Short
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Flat => write!(f, "FLAT"),
        }
    }
}
