//! Defaults for position orchestration.

use serde::{Deserialize, Serialize};

use crate::application::compose::ConcurrencyMode;

/// Orchestration defaults used when callers do not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// How per-order close commands are combined.
    #[serde(default)]
    pub batch_mode: ConcurrencyMode,
    /// How per-order stop-loss cancels are combined.
    #[serde(default)]
    pub cancel_sl_mode: ConcurrencyMode,
    /// How per-order take-profit cancels are combined.
    #[serde(default)]
    pub cancel_tp_mode: ConcurrencyMode,
    /// How the stop-loss batch and the take-profit batch are combined.
    #[serde(default)]
    pub cancel_sltp_mode: ConcurrencyMode,
    /// Prefix of generated merge labels.
    #[serde(default = "default_merge_label_prefix")]
    pub merge_label_prefix: String,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            batch_mode: ConcurrencyMode::default(),
            cancel_sl_mode: ConcurrencyMode::default(),
            cancel_tp_mode: ConcurrencyMode::default(),
            cancel_sltp_mode: ConcurrencyMode::default(),
            merge_label_prefix: default_merge_label_prefix(),
        }
    }
}

fn default_merge_label_prefix() -> String {
    "MergePosition_".to_string()
}
