//! Orchestration parameters.
//!
//! Each bundle is built from a plain options struct through a validating
//! factory and is immutable afterwards.

use std::fmt;
use std::sync::Arc;

use crate::application::compose::{ComposeParams, ConcurrencyMode, EventHandlers, ParamsError};
use crate::domain::shared::InstrumentId;

/// Options for merging a set of orders.
#[derive(Clone, Default)]
pub struct MergePositionOptions {
    /// Label of the merged order.
    pub merge_label: String,
    /// Parameters of each stop-loss cancel command; its mode combines the
    /// cancels across orders.
    pub cancel_sl: ComposeParams,
    /// Parameters of each take-profit cancel command; its mode combines the
    /// cancels across orders.
    pub cancel_tp: ComposeParams,
    /// Parameters of the merge command.
    pub merge: ComposeParams,
    /// Hooks around the whole merge; its mode combines the stop-loss batch
    /// with the take-profit batch.
    pub composition: ComposeParams,
    /// Callbacks for events answering any of the commands.
    pub handlers: EventHandlers,
}

/// Validated merge parameters.
#[derive(Clone, Debug)]
pub struct MergePositionParams {
    options: MergePositionOptions,
}

impl MergePositionParams {
    /// Validate `options`. The merge label must not be blank.
    pub fn new(options: MergePositionOptions) -> Result<Self, ParamsError> {
        if options.merge_label.trim().is_empty() {
            return Err(ParamsError::EmptyLabel);
        }
        Ok(Self { options })
    }

    /// Parameters with only a merge label.
    pub fn labelled(merge_label: impl Into<String>) -> Result<Self, ParamsError> {
        Self::new(MergePositionOptions {
            merge_label: merge_label.into(),
            ..MergePositionOptions::default()
        })
    }

    /// Copy of these parameters under another merge label.
    pub fn with_label(&self, merge_label: impl Into<String>) -> Result<Self, ParamsError> {
        Self::new(MergePositionOptions {
            merge_label: merge_label.into(),
            ..self.options.clone()
        })
    }

    /// Label of the merged order.
    #[must_use]
    pub fn merge_label(&self) -> &str {
        &self.options.merge_label
    }

    /// Stop-loss cancel batch mode.
    #[must_use]
    pub const fn cancel_sl_mode(&self) -> ConcurrencyMode {
        self.options.cancel_sl.concurrency_mode()
    }

    /// Take-profit cancel batch mode.
    #[must_use]
    pub const fn cancel_tp_mode(&self) -> ConcurrencyMode {
        self.options.cancel_tp.concurrency_mode()
    }

    /// Mode combining the two cancel batches.
    #[must_use]
    pub const fn cancel_sltp_mode(&self) -> ConcurrencyMode {
        self.options.composition.concurrency_mode()
    }

    /// Stop-loss cancel command parameters.
    #[must_use]
    pub const fn cancel_sl(&self) -> &ComposeParams {
        &self.options.cancel_sl
    }

    /// Take-profit cancel command parameters.
    #[must_use]
    pub const fn cancel_tp(&self) -> &ComposeParams {
        &self.options.cancel_tp
    }

    /// Merge command parameters.
    #[must_use]
    pub const fn merge(&self) -> &ComposeParams {
        &self.options.merge
    }

    /// Hooks around the whole merge.
    #[must_use]
    pub const fn composition(&self) -> &ComposeParams {
        &self.options.composition
    }

    /// Event callbacks.
    #[must_use]
    pub const fn handlers(&self) -> &EventHandlers {
        &self.options.handlers
    }
}

/// Options for closing a position.
#[derive(Clone, Default)]
pub struct ClosePositionOptions {
    /// Merge before closing; `None` closes the orders one by one.
    pub merge: Option<MergePositionParams>,
    /// Parameters of each close command; its mode combines the closes
    /// across orders.
    pub close: ComposeParams,
    /// Hooks around the whole close.
    pub composition: ComposeParams,
    /// Callbacks for events answering the close commands.
    pub handlers: EventHandlers,
}

/// Validated close parameters.
#[derive(Clone, Debug)]
pub struct ClosePositionParams {
    options: ClosePositionOptions,
}

impl ClosePositionParams {
    /// Build close parameters. Merge parameters are validated on their own.
    #[must_use]
    pub const fn new(options: ClosePositionOptions) -> Self {
        Self { options }
    }

    /// Close without merging first.
    #[must_use]
    pub fn without_merge() -> Self {
        Self::new(ClosePositionOptions::default())
    }

    /// Merge under `merge`, then close.
    #[must_use]
    pub fn merging(merge: MergePositionParams) -> Self {
        Self::new(ClosePositionOptions {
            merge: Some(merge),
            ..ClosePositionOptions::default()
        })
    }

    /// Merge step parameters, if the position is merged first.
    #[must_use]
    pub const fn merge(&self) -> Option<&MergePositionParams> {
        self.options.merge.as_ref()
    }

    /// Close command parameters.
    #[must_use]
    pub const fn close(&self) -> &ComposeParams {
        &self.options.close
    }

    /// Close batch mode.
    #[must_use]
    pub const fn close_mode(&self) -> ConcurrencyMode {
        self.options.close.concurrency_mode()
    }

    /// Hooks around the whole close.
    #[must_use]
    pub const fn composition(&self) -> &ComposeParams {
        &self.options.composition
    }

    /// Event callbacks.
    #[must_use]
    pub const fn handlers(&self) -> &EventHandlers {
        &self.options.handlers
    }
}

type MergeFactory = Arc<dyn Fn(&InstrumentId) -> Result<MergePositionParams, ParamsError> + Send + Sync>;
type CloseFactory = Arc<dyn Fn(&InstrumentId) -> ClosePositionParams + Send + Sync>;

/// Parameters for merging every known position.
#[derive(Clone)]
pub struct MergeAllPositionsParams {
    factory: MergeFactory,
    composition: ComposeParams,
}

impl MergeAllPositionsParams {
    /// Derive per-instrument parameters with `factory`.
    pub fn new(
        factory: impl Fn(&InstrumentId) -> Result<MergePositionParams, ParamsError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            composition: ComposeParams::default(),
        }
    }

    /// Use `template` for every position, labelled `<prefix><instrument>`.
    #[must_use]
    pub fn with_label_prefix(prefix: impl Into<String>, template: MergePositionParams) -> Self {
        let prefix = prefix.into();
        Self::new(move |instrument| template.with_label(merge_label(&prefix, instrument)))
    }

    /// Attach hooks around the whole run.
    #[must_use]
    pub fn with_composition(mut self, composition: ComposeParams) -> Self {
        self.composition = composition;
        self
    }

    /// Merge parameters for `instrument`.
    pub fn for_instrument(&self, instrument: &InstrumentId) -> Result<MergePositionParams, ParamsError> {
        (self.factory)(instrument)
    }

    /// Hooks around the whole run.
    #[must_use]
    pub const fn composition(&self) -> &ComposeParams {
        &self.composition
    }
}

/// Parameters for closing every known position.
#[derive(Clone)]
pub struct CloseAllPositionsParams {
    factory: CloseFactory,
    composition: ComposeParams,
}

impl CloseAllPositionsParams {
    /// Derive per-instrument parameters with `factory`.
    pub fn new(factory: impl Fn(&InstrumentId) -> ClosePositionParams + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            composition: ComposeParams::default(),
        }
    }

    /// Use the same parameters for every position.
    #[must_use]
    pub fn uniform(params: ClosePositionParams) -> Self {
        Self::new(move |_| params.clone())
    }

    /// Attach hooks around the whole run.
    #[must_use]
    pub fn with_composition(mut self, composition: ComposeParams) -> Self {
        self.composition = composition;
        self
    }

    /// Close parameters for `instrument`.
    #[must_use]
    pub fn for_instrument(&self, instrument: &InstrumentId) -> ClosePositionParams {
        (self.factory)(instrument)
    }

    /// Hooks around the whole run.
    #[must_use]
    pub const fn composition(&self) -> &ComposeParams {
        &self.composition
    }
}

/// Merge label for `instrument`: the prefix plus the instrument's
/// alphanumeric characters.
#[must_use]
pub fn merge_label(prefix: &str, instrument: &InstrumentId) -> String {
    let suffix: String = instrument
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    format!("{prefix}{suffix}")
}

impl fmt::Debug for MergePositionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergePositionOptions")
            .field("merge_label", &self.merge_label)
            .field("cancel_sl", &self.cancel_sl)
            .field("cancel_tp", &self.cancel_tp)
            .field("merge", &self.merge)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ClosePositionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosePositionOptions")
            .field("merge", &self.merge)
            .field("close", &self.close)
            .finish_non_exhaustive()
    }
}
