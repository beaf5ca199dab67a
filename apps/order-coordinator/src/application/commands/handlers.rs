//! Per-event-kind callbacks run while a command resolves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::order_execution::{OrderEvent, OrderEventKind};

/// Callback invoked with a correlated event.
pub type EventHandler = Arc<dyn Fn(&OrderEvent) + Send + Sync>;

/// Callbacks keyed by event kind.
///
/// Every event correlated to a command (informational ones included) is
/// dispatched synchronously before the command's outcome is returned.
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: HashMap<OrderEventKind, EventHandler>,
}

impl EventHandlers {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback for `kind`, replacing any previous one.
    #[must_use]
    pub fn on(
        mut self,
        kind: OrderEventKind,
        handler: impl Fn(&OrderEvent) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Run the callback registered for the event's kind, if any.
    pub fn dispatch(&self, event: &OrderEvent) {
        if let Some(handler) = self.handlers.get(&event.kind()) {
            handler(event);
        }
    }

    /// True if a callback is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: OrderEventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// True if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("EventHandlers").field("kinds", &kinds).finish()
    }
}
