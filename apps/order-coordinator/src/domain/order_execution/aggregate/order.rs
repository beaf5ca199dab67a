//! Order handle
//!
//! An `Order` is a cheap, cloneable handle to an order owned by the execution
//! engine. Identity and instrument never change; everything else lives in an
//! [`OrderSnapshot`] that only the engine adapter updates. This crate reads the
//! snapshot and changes it solely by issuing engine calls.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::value_objects::{OrderSide, OrderState};
use crate::domain::shared::{InstrumentId, OrderId};

/// Mutable attributes of an order, as last reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Lifecycle state.
    pub state: OrderState,
    /// Unsigned amount; the order side carries the sign.
    pub amount: Decimal,
    /// Strategy-assigned label.
    pub label: String,
    /// Requested open price for conditional orders.
    pub open_price: Option<Decimal>,
    /// Stop-loss price, `None` when no stop-loss is set.
    pub stop_loss: Option<Decimal>,
    /// Take-profit price, `None` when no take-profit is set.
    pub take_profit: Option<Decimal>,
    /// Good-till-time, `None` for good-till-cancel.
    pub good_till_time: Option<DateTime<Utc>>,
}

impl OrderSnapshot {
    /// Snapshot of a freshly created order.
    #[must_use]
    pub fn created(label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            state: OrderState::Created,
            amount,
            label: label.into(),
            open_price: None,
            stop_loss: None,
            take_profit: None,
            good_till_time: None,
        }
    }
}

struct OrderInner {
    id: OrderId,
    instrument: InstrumentId,
    side: OrderSide,
    created_at: DateTime<Utc>,
    snapshot: RwLock<OrderSnapshot>,
}

/// Shared handle to an engine-owned order.
///
/// Equality and hashing use the order identity only.
#[derive(Clone)]
pub struct Order {
    inner: Arc<OrderInner>,
}

impl Order {
    /// Create a handle for an order the engine has just created.
    #[must_use]
    pub fn new(
        id: OrderId,
        instrument: InstrumentId,
        side: OrderSide,
        snapshot: OrderSnapshot,
    ) -> Self {
        Self {
            inner: Arc::new(OrderInner {
                id,
                instrument,
                side,
                created_at: Utc::now(),
                snapshot: RwLock::new(snapshot),
            }),
        }
    }

    /// Get the order ID.
    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.inner.id
    }

    /// Get the instrument.
    #[must_use]
    pub fn instrument(&self) -> &InstrumentId {
        &self.inner.instrument
    }

    /// Get the order side.
    #[must_use]
    pub fn side(&self) -> OrderSide {
        self.inner.side
    }

    /// When the handle was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Copy of the current mutable attributes.
    #[must_use]
    pub fn snapshot(&self) -> OrderSnapshot {
        self.inner.snapshot.read().clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> OrderState {
        self.inner.snapshot.read().state
    }

    /// Current unsigned amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.inner.snapshot.read().amount
    }

    /// Amount carrying the side's sign (sell orders are negative).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.inner.side.signed(self.amount())
    }

    /// Current label.
    #[must_use]
    pub fn label(&self) -> String {
        self.inner.snapshot.read().label.clone()
    }

    /// Current open price.
    #[must_use]
    pub fn open_price(&self) -> Option<Decimal> {
        self.inner.snapshot.read().open_price
    }

    /// Current stop-loss price.
    #[must_use]
    pub fn stop_loss(&self) -> Option<Decimal> {
        self.inner.snapshot.read().stop_loss
    }

    /// Current take-profit price.
    #[must_use]
    pub fn take_profit(&self) -> Option<Decimal> {
        self.inner.snapshot.read().take_profit
    }

    /// Current good-till-time.
    #[must_use]
    pub fn good_till_time(&self) -> Option<DateTime<Utc>> {
        self.inner.snapshot.read().good_till_time
    }

    /// True if the order is filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.state() == OrderState::Filled
    }

    /// True if the order is a resting conditional order.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.state() == OrderState::Opened
    }

    /// True if the order is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == OrderState::Closed
    }

    /// Apply an engine-reported change to the snapshot.
    ///
    /// Only engine adapters call this; coordination code changes orders
    /// through engine calls.
    pub fn update(&self, apply: impl FnOnce(&mut OrderSnapshot)) {
        let mut snapshot = self.inner.snapshot.write();
        apply(&mut snapshot);
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Order {}

impl Hash for Order {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("id", &self.inner.id)
            .field("instrument", &self.inner.instrument)
            .field("side", &self.inner.side)
            .field("snapshot", &*self.inner.snapshot.read())
            .finish()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.id, self.inner.instrument)
    }
}

/// Sum of the signed amounts of `orders`.
#[must_use]
pub fn combined_signed_amount<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Decimal {
    orders.into_iter().map(Order::signed_amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, side: OrderSide, amount: Decimal) -> Order {
        Order::new(
            OrderId::new(id),
            InstrumentId::new("EURUSD"),
            side,
            OrderSnapshot::created(id, amount),
        )
    }

    #[test]
    fn new_order_is_created() {
        let order = order("buy-1", OrderSide::Buy, dec!(0.12));

        assert_eq!(order.state(), OrderState::Created);
        assert_eq!(order.label(), "buy-1");
        assert!(order.stop_loss().is_none());
        assert!(!order.is_filled());
    }

    #[test]
    fn signed_amount_uses_side() {
        assert_eq!(
            order("b", OrderSide::Buy, dec!(0.12)).signed_amount(),
            dec!(0.12)
        );
        assert_eq!(
            order("s", OrderSide::Sell, dec!(0.12)).signed_amount(),
            dec!(-0.12)
        );
    }

    #[test]
    fn clones_share_snapshot() {
        let order = order("buy-1", OrderSide::Buy, dec!(0.12));
        let handle = order.clone();

        order.update(|s| {
            s.state = OrderState::Filled;
            s.stop_loss = Some(dec!(1.0850));
        });

        assert!(handle.is_filled());
        assert_eq!(handle.stop_loss(), Some(dec!(1.0850)));
    }

    #[test]
    fn equality_is_by_id() {
        let first = order("same", OrderSide::Buy, dec!(0.1));
        let second = order("same", OrderSide::Sell, dec!(0.2));
        let other = order("other", OrderSide::Buy, dec!(0.1));

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn combined_signed_amount_nets_sides() {
        let orders = vec![
            order("b", OrderSide::Buy, dec!(0.12)),
            order("s", OrderSide::Sell, dec!(0.15)),
        ];

        assert_eq!(combined_signed_amount(&orders), dec!(-0.03));
    }
}
