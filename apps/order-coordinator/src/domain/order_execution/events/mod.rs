//! Order events reported by the execution engine.
//!
//! Every outcome of an engine call arrives as an [`OrderEvent`] on one
//! process-wide stream. Events for the same order keep engine delivery order;
//! events for different orders carry no relative ordering.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::aggregate::Order;
use crate::domain::shared::{InstrumentId, OrderId};

/// Kind of an engine-reported order event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventKind {
    /// Market order accepted.
    SubmitOk,
    /// Conditional order accepted and resting.
    SubmitConditionalOk,
    /// Submit rejected.
    SubmitRejected,
    /// Part of the order amount filled.
    PartialFillOk,
    /// Whole order amount filled.
    FullyFilled,
    /// Fill rejected; the order never became live.
    FillRejected,
    /// Label changed.
    ChangedLabel,
    /// Label change rejected.
    ChangeLabelRejected,
    /// Good-till-time changed.
    ChangedGtt,
    /// Good-till-time change rejected.
    ChangeGttRejected,
    /// Requested amount changed.
    ChangedAmount,
    /// Amount change rejected.
    ChangeAmountRejected,
    /// Open price changed.
    ChangedPrice,
    /// Open price change rejected.
    ChangePriceRejected,
    /// Stop-loss changed.
    ChangedSl,
    /// Stop-loss change rejected.
    ChangeSlRejected,
    /// Take-profit changed.
    ChangedTp,
    /// Take-profit change rejected.
    ChangeTpRejected,
    /// Order closed.
    CloseOk,
    /// Part of the order amount closed.
    PartialCloseOk,
    /// Close rejected.
    CloseRejected,
    /// Closed by its stop-loss.
    ClosedBySl,
    /// Closed by its take-profit.
    ClosedByTp,
    /// Merge produced a new order.
    MergeOk,
    /// Merge netted out to zero and closed.
    MergeCloseOk,
    /// Merge rejected.
    MergeRejected,
    /// Source order consumed by a merge.
    ClosedByMerge,
    /// Free-form engine notification.
    Notification,
}

impl OrderEventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [Self; 28] = [
        Self::SubmitOk,
        Self::SubmitConditionalOk,
        Self::SubmitRejected,
        Self::PartialFillOk,
        Self::FullyFilled,
        Self::FillRejected,
        Self::ChangedLabel,
        Self::ChangeLabelRejected,
        Self::ChangedGtt,
        Self::ChangeGttRejected,
        Self::ChangedAmount,
        Self::ChangeAmountRejected,
        Self::ChangedPrice,
        Self::ChangePriceRejected,
        Self::ChangedSl,
        Self::ChangeSlRejected,
        Self::ChangedTp,
        Self::ChangeTpRejected,
        Self::CloseOk,
        Self::PartialCloseOk,
        Self::CloseRejected,
        Self::ClosedBySl,
        Self::ClosedByTp,
        Self::MergeOk,
        Self::MergeCloseOk,
        Self::MergeRejected,
        Self::ClosedByMerge,
        Self::Notification,
    ];

    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitOk => "SUBMIT_OK",
            Self::SubmitConditionalOk => "SUBMIT_CONDITIONAL_OK",
            Self::SubmitRejected => "SUBMIT_REJECTED",
            Self::PartialFillOk => "PARTIAL_FILL_OK",
            Self::FullyFilled => "FULLY_FILLED",
            Self::FillRejected => "FILL_REJECTED",
            Self::ChangedLabel => "CHANGED_LABEL",
            Self::ChangeLabelRejected => "CHANGE_LABEL_REJECTED",
            Self::ChangedGtt => "CHANGED_GTT",
            Self::ChangeGttRejected => "CHANGE_GTT_REJECTED",
            Self::ChangedAmount => "CHANGED_AMOUNT",
            Self::ChangeAmountRejected => "CHANGE_AMOUNT_REJECTED",
            Self::ChangedPrice => "CHANGED_PRICE",
            Self::ChangePriceRejected => "CHANGE_PRICE_REJECTED",
            Self::ChangedSl => "CHANGED_SL",
            Self::ChangeSlRejected => "CHANGE_SL_REJECTED",
            Self::ChangedTp => "CHANGED_TP",
            Self::ChangeTpRejected => "CHANGE_TP_REJECTED",
            Self::CloseOk => "CLOSE_OK",
            Self::PartialCloseOk => "PARTIAL_CLOSE_OK",
            Self::CloseRejected => "CLOSE_REJECTED",
            Self::ClosedBySl => "CLOSED_BY_SL",
            Self::ClosedByTp => "CLOSED_BY_TP",
            Self::MergeOk => "MERGE_OK",
            Self::MergeCloseOk => "MERGE_CLOSE_OK",
            Self::MergeRejected => "MERGE_REJECTED",
            Self::ClosedByMerge => "CLOSED_BY_MERGE",
            Self::Notification => "NOTIFICATION",
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an event answers a call issued by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventOrigin {
    /// Caused by a call this process issued.
    Internal,
    /// Observed from elsewhere (another client, the platform itself).
    External,
}

/// One engine-reported outcome for one order.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    order: Order,
    kind: OrderEventKind,
    origin: EventOrigin,
    occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(order: Order, kind: OrderEventKind, origin: EventOrigin) -> Self {
        Self {
            order,
            kind,
            origin,
            occurred_at: Utc::now(),
        }
    }

    /// Event caused by a call this process issued.
    #[must_use]
    pub fn internal(order: Order, kind: OrderEventKind) -> Self {
        Self::new(order, kind, EventOrigin::Internal)
    }

    /// Event observed from outside this process.
    #[must_use]
    pub fn external(order: Order, kind: OrderEventKind) -> Self {
        Self::new(order, kind, EventOrigin::External)
    }

    /// The order this event refers to.
    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }

    /// Shortcut for the order's ID.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        self.order.id()
    }

    /// Shortcut for the order's instrument.
    #[must_use]
    pub fn instrument(&self) -> &InstrumentId {
        self.order.instrument()
    }

    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> OrderEventKind {
        self.kind
    }

    /// Event origin.
    #[must_use]
    pub const fn origin(&self) -> EventOrigin {
        self.origin
    }

    /// True if the event answers a call issued by this process.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.origin == EventOrigin::Internal
    }

    /// When the event was produced.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.kind, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::OrderSnapshot;
    use crate::domain::order_execution::value_objects::OrderSide;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn order() -> Order {
        Order::new(
            OrderId::new("ord-1"),
            InstrumentId::new("EURUSD"),
            OrderSide::Buy,
            OrderSnapshot::created("label", dec!(0.1)),
        )
    }

    #[test]
    fn all_kinds_are_distinct() {
        let unique: HashSet<_> = OrderEventKind::ALL.iter().collect();
        assert_eq!(unique.len(), OrderEventKind::ALL.len());
    }

    #[test]
    fn kind_serializes_like_display() {
        for kind in OrderEventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn event_origin_helpers() {
        let internal = OrderEvent::internal(order(), OrderEventKind::SubmitOk);
        let external = OrderEvent::external(order(), OrderEventKind::SubmitOk);

        assert!(internal.is_internal());
        assert!(!external.is_internal());
        assert_eq!(external.origin(), EventOrigin::External);
    }

    #[test]
    fn event_exposes_order_identity() {
        let event = OrderEvent::internal(order(), OrderEventKind::CloseOk);

        assert_eq!(event.order_id().as_str(), "ord-1");
        assert_eq!(event.instrument().as_str(), "EURUSD");
        assert_eq!(event.to_string(), "CLOSE_OK for ord-1 (EURUSD)");
    }
}
