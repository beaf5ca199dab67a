//! Order Event Stream Port (Driven Port)
//!
//! Subscribe-only access to the process-wide order event stream, plus
//! registration of synchronous sinks that see each event before any
//! subscriber does.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::order_execution::OrderEvent;

/// Synchronous consumer of every published event.
pub trait OrderEventSink: Send + Sync {
    /// Handle one event. Must not block and must not publish.
    fn on_event(&self, event: &OrderEvent);
}

/// Port for subscribing to order events.
///
/// Each receiver sees every event published after it subscribed, in publish
/// order. Dropping the receiver releases the subscription.
pub trait OrderEventStream: Send + Sync {
    /// Subscribe to events published from now on.
    fn subscribe(&self) -> broadcast::Receiver<OrderEvent>;

    /// Register a sink applied to each event ahead of the subscribers.
    fn register_sink(&self, sink: Arc<dyn OrderEventSink>);
}
