//! Retry policy for rejected commands.
//!
//! # Retryable Outcomes
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | Reject event (`*_REJECTED`, `FILL_REJECTED`) | Call error before any event |
//! | | Event stream closed or lagged |
//!
//! Every attempt executes a fresh clone of the command, so the idempotence
//! guard runs again against the order's current state. The delay between
//! attempts is a `tokio::time::sleep`; dropping the future cancels it.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::command::Command;
use super::error::CommandError;
use super::executor::CommandExecutor;
use super::handlers::EventHandlers;
use crate::config::RetryConfig;
use crate::domain::order_execution::OrderEvent;
use crate::observability::metrics::record_command_retry;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Re-attempts after the first rejection (0 = no retries).
    pub max_retries: u32,
    /// Delay before the first re-attempt.
    pub delay: Duration,
    /// Growth factor for each further delay (>= 1.0).
    pub backoff_multiplier: f64,
    /// Random extra delay as a fraction of the delay (0.0 = none).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub const fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Retry `max_retries` times with a constant `delay`.
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Set exponential growth of the delay.
    #[must_use]
    pub const fn with_backoff(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the jitter factor.
    #[must_use]
    pub const fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Delay before re-attempt number `retry` (0-based).
    ///
    /// Jitter only ever adds, so no re-attempt comes earlier than `delay`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0).powi(retry as i32);
        let base_nanos = self.delay.as_nanos() as f64 * multiplier;
        let jitter = self.jitter_factor.clamp(0.0, 1.0);
        let jittered_nanos = if jitter > 0.0 && base_nanos > 0.0 {
            let mut rng = rand::rng();
            base_nanos + rng.random_range(0.0..=base_nanos * jitter)
        } else {
            base_nanos
        };
        // Saturating float cast; never below the configured delay.
        Duration::from_nanos(jittered_nanos.ceil() as u64).max(self.delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.delay(),
            backoff_multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
        }
    }
}

/// Execute `command`, re-issuing it after each rejection up to the policy's
/// bound. Call errors and stream errors propagate immediately.
pub async fn execute_with_retries(
    executor: &CommandExecutor,
    command: &Command,
    handlers: &EventHandlers,
    policy: &RetryPolicy,
) -> Result<Option<OrderEvent>, CommandError> {
    let mut retry = 0;
    loop {
        let attempt = command.clone();
        match executor.execute(&attempt, handlers).await {
            Err(err) if err.is_retryable() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                retry += 1;
                if let CommandError::Rejected { event_kind, .. } = &err {
                    record_command_retry(command.kind(), *event_kind);
                }
                warn!(
                    kind = %command.kind(),
                    target = %command.target(),
                    retry,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying rejected command"
                );
                tokio::time::sleep(delay).await;
            }
            outcome => return outcome,
        }
    }
}
