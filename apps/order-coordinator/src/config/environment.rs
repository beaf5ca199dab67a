//! Environment configuration for trading mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where orders are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingMode {
    /// In-memory paper engine.
    #[default]
    Paper,
    /// Live broker engine.
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Environment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Trading mode.
    #[serde(default)]
    pub mode: TradingMode,
}

impl EnvironmentConfig {
    /// True when running against the paper engine.
    #[must_use]
    pub fn is_paper(&self) -> bool {
        self.mode == TradingMode::Paper
    }
}
