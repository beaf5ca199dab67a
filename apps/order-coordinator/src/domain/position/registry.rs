//! Position registry: one [`Position`] per instrument.
//!
//! Positions are created on first access and live as long as the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::aggregate::{MembershipChange, Position};
use crate::domain::order_execution::OrderEvent;
use crate::domain::shared::InstrumentId;

/// Map from instrument to its position.
#[derive(Debug, Default)]
pub struct PositionRegistry {
    positions: RwLock<HashMap<InstrumentId, Arc<Position>>>,
}

impl PositionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position for `instrument`, created empty on first access.
    pub fn for_instrument(&self, instrument: &InstrumentId) -> Arc<Position> {
        if let Some(position) = self.positions.read().get(instrument) {
            return Arc::clone(position);
        }
        let mut positions = self.positions.write();
        Arc::clone(
            positions
                .entry(instrument.clone())
                .or_insert_with(|| Arc::new(Position::new(instrument.clone()))),
        )
    }

    /// Position for `instrument` if one exists.
    #[must_use]
    pub fn get(&self, instrument: &InstrumentId) -> Option<Arc<Position>> {
        self.positions.read().get(instrument).cloned()
    }

    /// All known positions, ordered by instrument.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Position>> {
        let mut positions: Vec<_> = self.positions.read().values().cloned().collect();
        positions.sort_by(|a, b| a.instrument().cmp(b.instrument()));
        positions
    }

    /// All known instruments, sorted.
    #[must_use]
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<_> = self.positions.read().keys().cloned().collect();
        instruments.sort();
        instruments
    }

    /// Route `event` to its instrument's position.
    ///
    /// External events never create a position.
    pub fn apply(&self, event: &OrderEvent) -> MembershipChange {
        if !event.is_internal() {
            return MembershipChange::Unchanged;
        }
        self.for_instrument(event.instrument()).apply(event)
    }
}
