//! Retry configuration for rejected commands.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry configuration.
///
/// Only rejections are retried; call-time errors never are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Re-attempts after the first rejection (0 disables retries).
    #[serde(default)]
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
    /// Growth factor applied to the delay per attempt (>= 1.0).
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Random extra delay as a fraction of the delay (0.0 to 1.0).
    #[serde(default)]
    pub jitter_factor: f64,
}

impl RetryConfig {
    /// Base delay as a duration.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay_ms: 0,
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: 0.0,
        }
    }
}

const fn default_backoff_multiplier() -> f64 {
    1.0
}
