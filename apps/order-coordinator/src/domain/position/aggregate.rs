//! Position Aggregate
//!
//! One position per instrument. Membership is driven by internal order events
//! and nothing else: create kinds add the order, close kinds remove it. Each
//! event is applied under a single write lock so queries never observe a
//! partially applied event.
//!
//! The processing flag is a cooperative exclusion signal. Orders marked
//! processing are skipped by the selection queries (`filled`,
//! `filled_or_opened`, `not_processing`) so two concurrent batch operations do
//! not pick the same order; nothing stops a caller from acting on them directly.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::order_execution::classifier::{is_close_kind, is_create_kind};
use crate::domain::order_execution::{Direction, Order, OrderEvent, OrderState};
use crate::domain::shared::InstrumentId;

/// Effect of one event on position membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The order was added.
    Added,
    /// The order was removed.
    Removed,
    /// Membership did not change.
    Unchanged,
}

#[derive(Debug)]
struct Member {
    order: Order,
    processing: bool,
}

/// Orders currently belonging to one instrument.
#[derive(Debug)]
pub struct Position {
    instrument: InstrumentId,
    members: RwLock<Vec<Member>>,
}

impl Position {
    /// Create an empty position.
    #[must_use]
    pub fn new(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            members: RwLock::new(Vec::new()),
        }
    }

    /// Instrument of this position.
    #[must_use]
    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Apply one event to the membership set.
    ///
    /// External events and events for other instruments leave the position
    /// unchanged. Removal ignores the processing flag.
    pub fn apply(&self, event: &OrderEvent) -> MembershipChange {
        if !event.is_internal() || event.instrument() != &self.instrument {
            return MembershipChange::Unchanged;
        }

        let kind = event.kind();
        let mut members = self.members.write();
        let index = members.iter().position(|m| m.order == *event.order());

        match index {
            None if is_create_kind(kind) => {
                members.push(Member {
                    order: event.order().clone(),
                    processing: false,
                });
                MembershipChange::Added
            }
            Some(index) if is_close_kind(kind) => {
                members.remove(index);
                MembershipChange::Removed
            }
            _ => MembershipChange::Unchanged,
        }
    }

    /// Mark member orders as processing. Non-members are ignored.
    pub fn mark_orders_active(&self, orders: &[Order]) {
        self.set_processing(orders, true);
    }

    /// Mark member orders as idle. Non-members are ignored.
    pub fn mark_orders_idle(&self, orders: &[Order]) {
        self.set_processing(orders, false);
    }

    fn set_processing(&self, orders: &[Order], processing: bool) {
        let mut members = self.members.write();
        for member in members.iter_mut().filter(|m| orders.contains(&m.order)) {
            member.processing = processing;
        }
    }

    /// Select the idle members matching `predicate` and mark them processing
    /// until the returned guard is dropped. Selection and marking happen under
    /// one write lock, so concurrent claims never share an order.
    #[must_use]
    pub fn claim(self: &Arc<Self>, predicate: impl Fn(&Order) -> bool) -> ProcessingGuard {
        let mut members = self.members.write();
        let orders = members
            .iter_mut()
            .filter(|m| !m.processing && predicate(&m.order))
            .map(|m| {
                m.processing = true;
                m.order.clone()
            })
            .collect();
        ProcessingGuard {
            position: Arc::clone(self),
            orders,
        }
    }

    /// True if `order` is a member.
    #[must_use]
    pub fn contains(&self, order: &Order) -> bool {
        self.members.read().iter().any(|m| m.order == *order)
    }

    /// True if `order` is a member marked processing.
    #[must_use]
    pub fn is_processing(&self, order: &Order) -> bool {
        self.members
            .read()
            .iter()
            .any(|m| m.order == *order && m.processing)
    }

    /// Number of members.
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.read().len()
    }

    /// True if the position has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// All members, processing ones included, in admission order.
    #[must_use]
    pub fn all(&self) -> Vec<Order> {
        self.select(|_| true, true)
    }

    /// Idle members in state filled.
    #[must_use]
    pub fn filled(&self) -> Vec<Order> {
        self.select(|o| o.state() == OrderState::Filled, false)
    }

    /// Idle members in state filled or opened.
    #[must_use]
    pub fn filled_or_opened(&self) -> Vec<Order> {
        self.select(|o| o.state().is_live(), false)
    }

    /// Members matching `predicate`, processing ones included.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.select(predicate, true)
    }

    /// Idle members matching `predicate`.
    #[must_use]
    pub fn not_processing(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.select(predicate, false)
    }

    fn select(&self, predicate: impl Fn(&Order) -> bool, include_processing: bool) -> Vec<Order> {
        self.members
            .read()
            .iter()
            .filter(|m| include_processing || !m.processing)
            .filter(|m| predicate(&m.order))
            .map(|m| m.order.clone())
            .collect()
    }

    /// Sum of the signed amounts of filled members.
    ///
    /// Processing members count: they are still exposure until closed.
    #[must_use]
    pub fn signed_exposure(&self) -> Decimal {
        self.members
            .read()
            .iter()
            .filter(|m| m.order.is_filled())
            .map(|m| m.order.signed_amount())
            .sum()
    }

    /// Direction of the signed exposure.
    #[must_use]
    pub fn direction(&self) -> Direction {
        Direction::from_exposure(self.signed_exposure())
    }
}

/// Keeps orders marked processing; marks them idle again on drop.
#[derive(Debug)]
pub struct ProcessingGuard {
    position: Arc<Position>,
    orders: Vec<Order>,
}

impl ProcessingGuard {
    /// Orders held by the guard.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.position.mark_orders_idle(&self.orders);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderEventKind, OrderSide, OrderSnapshot};
    use crate::domain::shared::OrderId;
    use rust_decimal_macros::dec;

    fn eurusd() -> InstrumentId {
        InstrumentId::new("EURUSD")
    }

    fn order_on(instrument: &str, id: &str, side: OrderSide, amount: Decimal) -> Order {
        let order = Order::new(
            OrderId::new(id),
            InstrumentId::new(instrument),
            side,
            OrderSnapshot::created(id, amount),
        );
        order.update(|s| s.state = OrderState::Filled);
        order
    }

    fn order(id: &str) -> Order {
        order_on("EURUSD", id, OrderSide::Buy, dec!(0.12))
    }

    fn internal(order: &Order, kind: OrderEventKind) -> OrderEvent {
        OrderEvent::internal(order.clone(), kind)
    }

    #[test]
    fn membership_follows_events_in_order() {
        let position = Position::new(eurusd());
        let (o1, o2) = (order("o1"), order("o2"));

        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.apply(&internal(&o2, OrderEventKind::SubmitOk));
        position.apply(&internal(&o1, OrderEventKind::CloseOk));

        assert_eq!(position.all(), vec![o2.clone()]);
        assert_eq!(position.filled_or_opened(), vec![o2]);
    }

    #[test]
    fn create_event_is_applied_once() {
        let position = Position::new(eurusd());
        let o1 = order("o1");

        assert_eq!(
            position.apply(&internal(&o1, OrderEventKind::SubmitOk)),
            MembershipChange::Added
        );
        assert_eq!(
            position.apply(&internal(&o1, OrderEventKind::FullyFilled)),
            MembershipChange::Unchanged
        );
        assert_eq!(position.size(), 1);
    }

    #[test]
    fn external_events_are_ignored() {
        let position = Position::new(eurusd());
        let o1 = order("o1");

        let change = position.apply(&OrderEvent::external(o1, OrderEventKind::SubmitOk));

        assert_eq!(change, MembershipChange::Unchanged);
        assert!(position.is_empty());
    }

    #[test]
    fn other_instrument_is_ignored() {
        let position = Position::new(eurusd());
        let other = order_on("AUDUSD", "a1", OrderSide::Buy, dec!(0.1));

        position.apply(&internal(&other, OrderEventKind::SubmitOk));

        assert!(position.is_empty());
    }

    #[test]
    fn non_membership_kinds_leave_position_unchanged() {
        let position = Position::new(eurusd());
        let o1 = order("o1");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));

        for kind in [
            OrderEventKind::ChangedSl,
            OrderEventKind::PartialCloseOk,
            OrderEventKind::CloseRejected,
            OrderEventKind::Notification,
        ] {
            assert_eq!(
                position.apply(&internal(&o1, kind)),
                MembershipChange::Unchanged
            );
        }
        assert!(position.contains(&o1));
    }

    #[test]
    fn fill_rejected_removes_order() {
        let position = Position::new(eurusd());
        let o1 = order("o1");

        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.apply(&internal(&o1, OrderEventKind::FillRejected));

        assert!(!position.contains(&o1));
    }

    #[test]
    fn processing_orders_are_excluded_from_selection() {
        let position = Position::new(eurusd());
        let o1 = order("o1");
        let o2 = order("o2");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.apply(&internal(&o2, OrderEventKind::SubmitOk));

        position.mark_orders_active(std::slice::from_ref(&o1));

        assert_eq!(position.not_processing(|_| true), vec![o2.clone()]);
        assert_eq!(position.filled(), vec![o2.clone()]);
        assert_eq!(position.all().len(), 2);
        assert!(position.is_processing(&o1));

        position.mark_orders_idle(std::slice::from_ref(&o1));

        assert_eq!(position.not_processing(|_| true), vec![o1, o2]);
    }

    #[test]
    fn marking_non_members_is_ignored() {
        let position = Position::new(eurusd());
        let stranger = order("stranger");

        position.mark_orders_active(std::slice::from_ref(&stranger));

        assert!(!position.is_processing(&stranger));
        assert!(position.is_empty());
    }

    #[test]
    fn close_removes_processing_order() {
        let position = Position::new(eurusd());
        let o1 = order("o1");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.mark_orders_active(std::slice::from_ref(&o1));

        let change = position.apply(&internal(&o1, OrderEventKind::ClosedBySl));

        assert_eq!(change, MembershipChange::Removed);
        assert!(position.all().is_empty());
    }

    #[test]
    fn guard_marks_idle_on_drop() {
        let position = Arc::new(Position::new(eurusd()));
        let o1 = order("o1");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));

        {
            let guard = position.claim(|_| true);
            assert_eq!(guard.orders(), std::slice::from_ref(&o1));
            assert!(position.filled().is_empty());
        }

        assert_eq!(position.filled(), vec![o1]);
    }

    #[test]
    fn claims_never_share_orders() {
        let position = Arc::new(Position::new(eurusd()));
        let (o1, o2) = (order("o1"), order("o2"));
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.apply(&internal(&o2, OrderEventKind::SubmitOk));

        let first = position.claim(|o| o.state() == OrderState::Filled);
        let second = position.claim(|o| o.state() == OrderState::Filled);

        assert_eq!(first.orders(), &[o1.clone(), o2.clone()]);
        assert!(second.orders().is_empty());
        drop(first);
        assert_eq!(position.claim(|o| o.label() == "o2").orders(), &[o2]);
        assert!(!position.is_processing(&o1));
    }

    #[test]
    fn concurrent_claims_split_the_members() {
        let position = Arc::new(Position::new(eurusd()));
        let orders: Vec<Order> = (0..64).map(|i| order(&format!("o{i}"))).collect();
        for o in &orders {
            position.apply(&internal(o, OrderEventKind::SubmitOk));
        }

        let guards: Vec<ProcessingGuard> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| position.claim(|_| true)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(orders.iter().all(|o| position.is_processing(o)));
        assert_eq!(guards.iter().map(|g| g.orders().len()).sum::<usize>(), orders.len());
    }

    #[test]
    fn exposure_and_direction() {
        let position = Position::new(eurusd());
        let buy = order_on("EURUSD", "buy", OrderSide::Buy, dec!(0.12));
        let sell = order_on("EURUSD", "sell", OrderSide::Sell, dec!(0.12));
        position.apply(&internal(&buy, OrderEventKind::SubmitOk));
        position.apply(&internal(&sell, OrderEventKind::SubmitOk));

        assert_eq!(position.signed_exposure(), dec!(0.00));
        assert_eq!(position.direction(), Direction::Flat);

        sell.update(|s| s.amount = dec!(0.15));

        assert_eq!(position.signed_exposure(), dec!(-0.03));
        assert_eq!(position.direction(), Direction::Short);
    }

    #[test]
    fn opened_orders_do_not_count_as_exposure() {
        let position = Position::new(eurusd());
        let opened = order("opened");
        opened.update(|s| s.state = OrderState::Opened);
        position.apply(&internal(&opened, OrderEventKind::SubmitConditionalOk));

        assert_eq!(position.filled_or_opened(), vec![opened]);
        assert!(position.filled().is_empty());
        assert_eq!(position.direction(), Direction::Flat);
    }

    #[test]
    fn processing_orders_still_count_as_exposure() {
        let position = Position::new(eurusd());
        let o1 = order("o1");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.mark_orders_active(std::slice::from_ref(&o1));

        assert_eq!(position.signed_exposure(), dec!(0.12));
        assert_eq!(position.direction(), Direction::Long);
    }

    #[test]
    fn filter_includes_processing_orders() {
        let position = Position::new(eurusd());
        let o1 = order("o1");
        position.apply(&internal(&o1, OrderEventKind::SubmitOk));
        position.mark_orders_active(std::slice::from_ref(&o1));

        assert_eq!(position.filter(|o| o.label() == "o1"), vec![o1]);
    }
}
