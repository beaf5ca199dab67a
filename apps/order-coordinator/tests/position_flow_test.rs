//! Position Flow Integration Tests
//!
//! Drives the coordinator against the paper engine and checks that position
//! membership, processing marks, and exposure follow the order events.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use order_coordinator::application::use_cases::MergePositionParams;
use order_coordinator::config::OrchestrationConfig;
use order_coordinator::{
    CommandKind, ComposeParams, Direction, InstrumentId, Order, OrderCoordinator, OrderEventHub,
    OrderEventKind, OrderSide, OrderSpec, PaperEngine,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Session {
    engine: Arc<PaperEngine>,
    coordinator: OrderCoordinator,
}

fn session() -> Session {
    let hub = Arc::new(OrderEventHub::new(256));
    let engine = Arc::new(PaperEngine::new(Arc::clone(&hub)));
    let coordinator = OrderCoordinator::new(engine.clone(), hub, OrchestrationConfig::default());
    Session {
        engine,
        coordinator,
    }
}

fn eurusd() -> InstrumentId {
    InstrumentId::new("EURUSD")
}

async fn fill(session: &Session, side: OrderSide, amount: Decimal) -> Order {
    let spec = OrderSpec::market(eurusd(), side, amount, "flow");
    session
        .coordinator
        .submit(spec, &ComposeParams::default())
        .await
        .expect("submit should succeed")
        .expect("submit is never a no-op")
        .order()
        .clone()
}

// ============================================
// Membership
// ============================================

#[tokio::test]
async fn submit_submit_close_leaves_second_order() {
    let s = session();
    let o1 = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let o2 = fill(&s, OrderSide::Buy, dec!(0.2)).await;

    s.coordinator
        .close(o1.clone(), &ComposeParams::default())
        .await
        .unwrap();

    let position = s.coordinator.position(&eurusd());
    assert_eq!(position.all(), vec![o2.clone()]);
    assert_eq!(position.filled_or_opened(), vec![o2]);
    assert!(o1.is_closed());
}

#[tokio::test]
async fn filled_or_opened_reflects_current_state() {
    let s = session();
    let spec = OrderSpec::conditional(eurusd(), OrderSide::Buy, dec!(0.1), "limit", dec!(1.0800));
    let resting = s
        .coordinator
        .submit(spec, &ComposeParams::default())
        .await
        .unwrap()
        .unwrap()
        .order()
        .clone();
    let position = s.coordinator.position(&eurusd());

    assert_eq!(position.filled_or_opened(), vec![resting.clone()]);
    assert!(position.filled().is_empty());
    assert_eq!(position.signed_exposure(), Decimal::ZERO);

    s.engine.fill(&resting);

    assert_eq!(position.filled(), vec![resting]);
    assert_eq!(position.signed_exposure(), dec!(0.1));
}

#[tokio::test]
async fn rejected_submit_never_joins_the_position() {
    let s = session();
    s.engine.reject_next(CommandKind::Submit, 1);

    let result = s
        .coordinator
        .submit(
            OrderSpec::market(eurusd(), OrderSide::Buy, dec!(0.1), "flow"),
            &ComposeParams::default(),
        )
        .await;

    let err = result.unwrap_err();
    assert!(err.is_rejection());
    assert!(s.coordinator.position(&eurusd()).is_empty());
}

// ============================================
// Processing marks
// ============================================

#[tokio::test]
async fn processing_orders_are_skipped_then_restored() {
    let s = session();
    let o1 = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let o2 = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let position = s.coordinator.position(&eurusd());

    position.mark_orders_active(std::slice::from_ref(&o1));
    assert_eq!(position.not_processing(|_| true), vec![o2.clone()]);
    assert_eq!(position.all().len(), 2);

    position.mark_orders_idle(std::slice::from_ref(&o1));
    assert_eq!(position.not_processing(|_| true), vec![o1, o2]);
}

#[tokio::test]
async fn stop_loss_close_removes_a_processing_order() {
    let s = session();
    let order = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let position = s.coordinator.position(&eurusd());
    position.mark_orders_active(std::slice::from_ref(&order));

    s.engine.trigger_stop_loss(&order);

    assert!(position.is_empty());
}

#[tokio::test]
async fn merge_marks_orders_only_while_running() {
    let s = session();
    let o1 = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let o2 = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    s.engine.mute_next(CommandKind::Merge, 1);
    let position = s.coordinator.position(&eurusd());

    let merge = s
        .coordinator
        .merge_position(eurusd(), MergePositionParams::labelled("Merged").unwrap());
    let running = tokio::spawn(order_coordinator::application::compose::run_to_completion(merge));

    for _ in 0..50 {
        if s.engine.call_count(CommandKind::Merge) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(position.is_processing(&o1) && position.is_processing(&o2));
    assert!(position.filled().is_empty());

    running.abort();
    let _ = running.await;

    assert!(!position.is_processing(&o1) && !position.is_processing(&o2));
    assert_eq!(position.filled().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_merges_never_share_orders() {
    let s = session();
    fill(&s, OrderSide::Buy, dec!(0.1)).await;
    fill(&s, OrderSide::Buy, dec!(0.1)).await;
    s.engine.mute_next(CommandKind::Merge, 1);

    let first = tokio::spawn(order_coordinator::application::compose::run_to_completion(
        s.coordinator
            .merge_position(eurusd(), MergePositionParams::labelled("First").unwrap()),
    ));
    for _ in 0..200 {
        if s.engine.call_count(CommandKind::Merge) == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(s.engine.call_count(CommandKind::Merge), 1);

    let second = order_coordinator::application::compose::run_to_completion(
        s.coordinator
            .merge_position(eurusd(), MergePositionParams::labelled("Second").unwrap()),
    )
    .await
    .unwrap();

    assert!(second.is_empty());
    assert_eq!(s.engine.call_count(CommandKind::Merge), 1);
    first.abort();
    let _ = first.await;
    assert_eq!(s.coordinator.position(&eurusd()).filled().len(), 2);
}

// ============================================
// Exposure
// ============================================

#[tokio::test]
async fn hedged_position_turns_short_after_amount_change() {
    let s = session();
    fill(&s, OrderSide::Buy, dec!(0.12)).await;
    let short = fill(&s, OrderSide::Sell, dec!(0.12)).await;
    let position = s.coordinator.position(&eurusd());

    assert_eq!(position.signed_exposure(), dec!(0.0));
    assert_eq!(position.direction(), Direction::Flat);

    let changed = s
        .coordinator
        .set_amount(short, dec!(0.15), &ComposeParams::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(changed.kind(), OrderEventKind::ChangedAmount);
    assert_eq!(position.direction(), Direction::Short);
    assert_eq!(position.signed_exposure(), dec!(-0.03));
}

#[tokio::test]
async fn external_orders_are_ignored() {
    let s = session();
    let own = fill(&s, OrderSide::Buy, dec!(0.1)).await;
    let foreign = Order::new(
        order_coordinator::OrderId::new("other-strategy-1"),
        eurusd(),
        OrderSide::Sell,
        order_coordinator::domain::order_execution::OrderSnapshot::created("x", dec!(5)),
    );

    s.engine.publish_external(&foreign, OrderEventKind::FullyFilled);
    s.engine.publish_external(&own, OrderEventKind::CloseOk);

    let position = s.coordinator.position(&eurusd());
    assert_eq!(position.all(), vec![own]);
    assert_eq!(position.signed_exposure(), dec!(0.1));
}
