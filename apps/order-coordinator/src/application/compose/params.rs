//! Compose parameters.
//!
//! Immutable bundles built through a validating factory and attached to one
//! orchestration call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::commands::{CommandError, RetryPolicy};
use crate::config::MAX_RETRIES;

/// How several outcome producers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConcurrencyMode {
    /// Start all producers at once.
    #[default]
    Parallel,
    /// Start each producer after the previous one completed.
    Sequential,
}

/// Side-effect hook without arguments.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Side-effect hook receiving the error that ended a composition.
pub type ErrorHook = Arc<dyn Fn(&CommandError) + Send + Sync>;

/// Parameter validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    /// Too many retries requested.
    #[error("retry count {count} exceeds the maximum of {max}")]
    RetryCountTooLarge {
        /// Requested count.
        count: u32,
        /// Allowed maximum.
        max: u32,
    },

    /// Backoff multiplier below 1.0 or not finite.
    #[error("backoff multiplier must be at least 1.0, got {0}")]
    InvalidBackoff(f64),

    /// Jitter factor outside [0.0, 1.0].
    #[error("jitter factor must be between 0.0 and 1.0, got {0}")]
    InvalidJitter(f64),

    /// Empty merge label.
    #[error("merge label must not be empty")]
    EmptyLabel,
}

/// Recognised compose options.
#[derive(Clone, Default)]
pub struct ComposeOptions {
    /// Re-attempts after a rejection.
    pub retry_count: u32,
    /// Wait between attempts.
    pub retry_delay: Duration,
    /// Runs when the composition starts.
    pub on_start: Option<Hook>,
    /// Runs when the composition completes without error.
    pub on_complete: Option<Hook>,
    /// Runs with the error that ended the composition.
    pub on_error: Option<ErrorHook>,
    /// How the producers of the batch these parameters drive are combined.
    pub concurrency_mode: ConcurrencyMode,
}

/// Validated compose parameters.
///
/// The default has no retries, no hooks, and parallel mode.
#[derive(Clone, Default)]
pub struct ComposeParams {
    retry: RetryPolicy,
    on_start: Option<Hook>,
    on_complete: Option<Hook>,
    on_error: Option<ErrorHook>,
    concurrency_mode: ConcurrencyMode,
}

impl ComposeParams {
    /// Validate `options` into parameters.
    pub fn new(options: ComposeOptions) -> Result<Self, ParamsError> {
        let retry = RetryPolicy::fixed(options.retry_count, options.retry_delay);
        validate_retry(&retry)?;
        Ok(Self {
            retry,
            on_start: options.on_start,
            on_complete: options.on_complete,
            on_error: options.on_error,
            concurrency_mode: options.concurrency_mode,
        })
    }

    /// Parameters with only a retry policy.
    pub fn with_retry_policy(retry: RetryPolicy) -> Result<Self, ParamsError> {
        validate_retry(&retry)?;
        Ok(Self {
            retry,
            ..Self::default()
        })
    }

    /// Parameters with only a concurrency mode.
    #[must_use]
    pub fn with_mode(concurrency_mode: ConcurrencyMode) -> Self {
        Self {
            concurrency_mode,
            ..Self::default()
        }
    }

    /// Copy of these parameters combining producers in `concurrency_mode`.
    #[must_use]
    pub fn in_mode(mut self, concurrency_mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = concurrency_mode;
        self
    }

    /// Retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Concurrency mode.
    #[must_use]
    pub const fn concurrency_mode(&self) -> ConcurrencyMode {
        self.concurrency_mode
    }

    pub(crate) fn notify_start(&self) {
        if let Some(hook) = &self.on_start {
            hook();
        }
    }

    pub(crate) fn notify_complete(&self) {
        if let Some(hook) = &self.on_complete {
            hook();
        }
    }

    pub(crate) fn notify_error(&self, err: &CommandError) {
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

fn validate_retry(retry: &RetryPolicy) -> Result<(), ParamsError> {
    if retry.max_retries > MAX_RETRIES {
        return Err(ParamsError::RetryCountTooLarge {
            count: retry.max_retries,
            max: MAX_RETRIES,
        });
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(ParamsError::InvalidBackoff(retry.backoff_multiplier));
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return Err(ParamsError::InvalidJitter(retry.jitter_factor));
    }
    Ok(())
}

impl fmt::Debug for ComposeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeParams")
            .field("retry", &self.retry)
            .field("concurrency_mode", &self.concurrency_mode)
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
