//! The outbound event stream the core exposes for observers (logging,
//! achievements, third-party mods) that want to react to state changes
//! without polling (spec.md §11.3 supplement).
//!
//! Grounded directly on the teacher's `event.rs` `EventBus`: a typed event
//! enum plus a `Vec` buffer drained once per tick, rather than a callback
//! or channel, matching the core's synchronous, single-threaded tick
//! model.

use crate::ids::{DealId, FarmId, GameTime, Money, VehicleId};
use crate::reliability::{Component, MalfunctionKind};
use serde::{Deserialize, Serialize};

/// A state-change notification the core emits for external observers
/// (spec.md §11.3). These are informational only — the core never reads
/// them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreEvent {
    CreditScoreChanged { farm_id: FarmId, when: GameTime, old_score: i32, new_score: i32 },
    PaymentMade { farm_id: FarmId, deal_id: DealId, when: GameTime, amount: Money },
    PaymentMissed { farm_id: FarmId, deal_id: DealId, when: GameTime },
    DealCreated { farm_id: FarmId, deal_id: DealId, when: GameTime },
    DealCompleted { farm_id: FarmId, deal_id: DealId, when: GameTime },
    MalfunctionTriggered { vehicle_id: VehicleId, when: GameTime, kind: MalfunctionKind },
    MalfunctionEnded { vehicle_id: VehicleId, when: GameTime },
    VehicleRepaired { vehicle_id: VehicleId, when: GameTime, component: Option<Component> },
}

/// Buffers [`CoreEvent`]s produced during a tick or request handler for an
/// observer to drain (spec.md §11.3 "CoreEventBus"). Mirrors the
/// teacher's own buffer-and-drain `EventBus`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreEventBus {
    events: Vec<CoreEvent>,
}

impl CoreEventBus {
    pub fn new() -> Self {
        CoreEventBus::default()
    }

    pub fn push(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    /// Removes and returns every buffered event, in emission order.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
