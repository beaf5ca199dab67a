//! Event Classifier
//!
//! Static metadata mapping each command kind to the event kinds that can
//! answer it, split into decisive (done / rejected) and informational kinds.
//! Also names the event kinds that add orders to or remove orders from a
//! position. This table is the only place these sets are defined.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::order_execution::events::OrderEventKind;

/// Kind of a command issued against the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Submit a new order.
    Submit,
    /// Merge several orders into one.
    Merge,
    /// Close an order.
    Close,
    /// Change the label.
    SetLabel,
    /// Change the good-till-time.
    SetGtt,
    /// Change the requested amount.
    SetAmount,
    /// Change the open price.
    SetOpenPrice,
    /// Change or cancel the stop-loss.
    SetStopLoss,
    /// Change or cancel the take-profit.
    SetTakeProfit,
}

impl CommandKind {
    /// Every command kind.
    pub const ALL: [Self; 9] = [
        Self::Submit,
        Self::Merge,
        Self::Close,
        Self::SetLabel,
        Self::SetGtt,
        Self::SetAmount,
        Self::SetOpenPrice,
        Self::SetStopLoss,
        Self::SetTakeProfit,
    ];

    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Merge => "merge",
            Self::Close => "close",
            Self::SetLabel => "set_label",
            Self::SetGtt => "set_gtt",
            Self::SetAmount => "set_amount",
            Self::SetOpenPrice => "set_open_price",
            Self::SetStopLoss => "set_stop_loss",
            Self::SetTakeProfit => "set_take_profit",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an event kind resolves a command of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The command succeeded.
    Done,
    /// The engine rejected the command.
    Rejected,
    /// Relevant to the command but not decisive.
    Informational,
}

use OrderEventKind as K;

const SUBMIT_ALL: &[OrderEventKind] = &[
    K::SubmitOk,
    K::SubmitConditionalOk,
    K::PartialFillOk,
    K::FullyFilled,
    K::SubmitRejected,
    K::FillRejected,
    K::Notification,
];
const SUBMIT_DONE: &[OrderEventKind] = &[K::FullyFilled, K::SubmitConditionalOk];
const SUBMIT_REJECT: &[OrderEventKind] = &[K::SubmitRejected, K::FillRejected];

const MERGE_ALL: &[OrderEventKind] = &[
    K::MergeOk,
    K::MergeCloseOk,
    K::MergeRejected,
    K::Notification,
];
const MERGE_DONE: &[OrderEventKind] = &[K::MergeOk, K::MergeCloseOk];
const MERGE_REJECT: &[OrderEventKind] = &[K::MergeRejected];

const CLOSE_ALL: &[OrderEventKind] = &[
    K::CloseOk,
    K::PartialCloseOk,
    K::CloseRejected,
    K::Notification,
];
const CLOSE_DONE: &[OrderEventKind] = &[K::CloseOk];
const CLOSE_REJECT: &[OrderEventKind] = &[K::CloseRejected];

const LABEL_ALL: &[OrderEventKind] = &[K::ChangedLabel, K::ChangeLabelRejected, K::Notification];
const GTT_ALL: &[OrderEventKind] = &[K::ChangedGtt, K::ChangeGttRejected, K::Notification];
const AMOUNT_ALL: &[OrderEventKind] =
    &[K::ChangedAmount, K::ChangeAmountRejected, K::Notification];
const PRICE_ALL: &[OrderEventKind] = &[K::ChangedPrice, K::ChangePriceRejected, K::Notification];
const SL_ALL: &[OrderEventKind] = &[K::ChangedSl, K::ChangeSlRejected, K::Notification];
const TP_ALL: &[OrderEventKind] = &[K::ChangedTp, K::ChangeTpRejected, K::Notification];

/// Event kinds that add an order to its position.
const CREATE_KINDS: &[OrderEventKind] = &[
    K::SubmitOk,
    K::SubmitConditionalOk,
    K::PartialFillOk,
    K::FullyFilled,
    K::MergeOk,
];

/// Event kinds that remove an order from its position.
const CLOSE_KINDS: &[OrderEventKind] = &[
    K::CloseOk,
    K::ClosedBySl,
    K::ClosedByTp,
    K::ClosedByMerge,
    K::MergeCloseOk,
    K::FillRejected,
];

/// All event kinds relevant to `kind`.
#[must_use]
pub const fn event_kinds_for(kind: CommandKind) -> &'static [OrderEventKind] {
    match kind {
        CommandKind::Submit => SUBMIT_ALL,
        CommandKind::Merge => MERGE_ALL,
        CommandKind::Close => CLOSE_ALL,
        CommandKind::SetLabel => LABEL_ALL,
        CommandKind::SetGtt => GTT_ALL,
        CommandKind::SetAmount => AMOUNT_ALL,
        CommandKind::SetOpenPrice => PRICE_ALL,
        CommandKind::SetStopLoss => SL_ALL,
        CommandKind::SetTakeProfit => TP_ALL,
    }
}

/// Event kinds signalling success of `kind`.
#[must_use]
pub const fn done_kinds_for(kind: CommandKind) -> &'static [OrderEventKind] {
    match kind {
        CommandKind::Submit => SUBMIT_DONE,
        CommandKind::Merge => MERGE_DONE,
        CommandKind::Close => CLOSE_DONE,
        CommandKind::SetLabel => &[K::ChangedLabel],
        CommandKind::SetGtt => &[K::ChangedGtt],
        CommandKind::SetAmount => &[K::ChangedAmount],
        CommandKind::SetOpenPrice => &[K::ChangedPrice],
        CommandKind::SetStopLoss => &[K::ChangedSl],
        CommandKind::SetTakeProfit => &[K::ChangedTp],
    }
}

/// Event kinds signalling rejection of `kind`.
#[must_use]
pub const fn reject_kinds_for(kind: CommandKind) -> &'static [OrderEventKind] {
    match kind {
        CommandKind::Submit => SUBMIT_REJECT,
        CommandKind::Merge => MERGE_REJECT,
        CommandKind::Close => CLOSE_REJECT,
        CommandKind::SetLabel => &[K::ChangeLabelRejected],
        CommandKind::SetGtt => &[K::ChangeGttRejected],
        CommandKind::SetAmount => &[K::ChangeAmountRejected],
        CommandKind::SetOpenPrice => &[K::ChangePriceRejected],
        CommandKind::SetStopLoss => &[K::ChangeSlRejected],
        CommandKind::SetTakeProfit => &[K::ChangeTpRejected],
    }
}

/// Classify `event` for a command of kind `command`.
///
/// Returns `None` when the event kind is not relevant to the command and must
/// be ignored for its resolution.
#[must_use]
pub fn resolve(command: CommandKind, event: OrderEventKind) -> Option<Resolution> {
    if !event_kinds_for(command).contains(&event) {
        return None;
    }
    if done_kinds_for(command).contains(&event) {
        Some(Resolution::Done)
    } else if reject_kinds_for(command).contains(&event) {
        Some(Resolution::Rejected)
    } else {
        Some(Resolution::Informational)
    }
}

/// True if `event` adds its order to a position.
#[must_use]
pub fn is_create_kind(event: OrderEventKind) -> bool {
    CREATE_KINDS.contains(&event)
}

/// True if `event` removes its order from a position.
#[must_use]
pub fn is_close_kind(event: OrderEventKind) -> bool {
    CLOSE_KINDS.contains(&event)
}
