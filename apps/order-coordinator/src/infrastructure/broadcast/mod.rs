//! Order event hub.
//!
//! Fan-out bus for order events. Publishing is serialised: each event first
//! goes to the registered synchronous sinks (the position registry), then to
//! the Tokio broadcast channel. A command awaiting an event therefore always
//! sees position membership that already includes it.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::application::ports::{OrderEventSink, OrderEventStream};
use crate::domain::order_execution::OrderEvent;
use crate::domain::position::PositionRegistry;
use crate::observability::metrics::record_membership_change;

impl OrderEventSink for PositionRegistry {
    fn on_event(&self, event: &OrderEvent) {
        let change = self.apply(event);
        if let Some(position) = self.get(event.instrument()) {
            debug!(
                instrument = %event.instrument(),
                order_id = %event.order_id(),
                event = %event.kind(),
                change = ?change,
                size = position.size(),
                "Position event applied"
            );
            record_membership_change(event.instrument(), change, position.size());
        }
    }
}

/// Process-wide order event bus.
pub struct OrderEventHub {
    sender: broadcast::Sender<OrderEvent>,
    sinks: RwLock<Vec<Arc<dyn OrderEventSink>>>,
    publish_lock: Mutex<()>,
}

impl OrderEventHub {
    /// Create a hub buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sinks: RwLock::new(Vec::new()),
            publish_lock: Mutex::new(()),
        }
    }

    /// Register a sink that sees every event before subscribers do.
    pub fn register_sink(&self, sink: Arc<dyn OrderEventSink>) {
        self.sinks.write().push(sink);
    }

    /// Publish one event to the sinks, then to the subscribers.
    pub fn publish(&self, event: OrderEvent) {
        let _guard = self.publish_lock.lock();
        for sink in self.sinks.read().iter() {
            sink.on_event(&event);
        }
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl OrderEventStream for OrderEventHub {
    fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    fn register_sink(&self, sink: Arc<dyn OrderEventSink>) {
        Self::register_sink(self, sink);
    }
}

impl std::fmt::Debug for OrderEventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEventHub")
            .field("receivers", &self.sender.receiver_count())
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}
