/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Per-origin transition state for a node serving many senders.
//!
//! Each origin reference carried in a [`ConsentHeader`] gets its own
//! [`TransitionManager`]; no state is shared between origins. The table is
//! bounded at [`MAX_SESSIONS`] and evicts the least recently active origin
//! when a new one arrives at capacity.

use hashbrown::HashMap;

use crate::coherence::CoherenceResult;
use crate::consent::ConsentState;
use crate::header::ConsentHeader;
use crate::sector::{route_to_sector, RoutableSector, RoutingDecision};
use crate::transition::{TickResult, TransitionConfig, TransitionManager};

/// Maximum number of tracked origins. The least recently active is evicted when full.
pub const MAX_SESSIONS: usize = 64;

/// One origin's transition state.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSlot {
    /// Transition state.
    pub manager: TransitionManager,
    /// Caller clock value of the most recent tick.
    pub last_active: u64,
}

/// Origin-keyed map of transition managers.
pub struct SessionTable {
    config: TransitionConfig,
    slots: HashMap<u16, SessionSlot>,
}

impl SessionTable {
    /// Empty table; new sessions start from `config`.
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            slots: HashMap::new(),
        }
    }

    /// Tick `origin`'s manager, creating it if needed.
    pub fn tick(
        &mut self,
        origin: u16,
        detected: ConsentState,
        coherence: u16,
        is_emergency: bool,
        now: u64,
    ) -> TickResult {
        let slot = self.get_or_create(origin);
        slot.last_active = now;
        slot.manager.tick(detected, coherence, is_emergency)
    }

    /// Tick the manager of the header's origin with the header's consent state.
    pub fn observe(
        &mut self,
        header: &ConsentHeader,
        coherence: &CoherenceResult,
        is_emergency: bool,
        now: u64,
    ) -> TickResult {
        self.tick(
            header.origin_ref,
            header.consent_state(),
            coherence.score,
            is_emergency,
            now,
        )
    }

    /// Route for `origin`. Unknown origins route as SUSPENDED_CONSENT.
    pub fn route(
        &self,
        origin: u16,
        requested: RoutableSector,
        coherence: u16,
        allow_fallback: bool,
    ) -> RoutingDecision {
        route_to_sector(self.routing_state(origin), requested, coherence, allow_fallback)
    }

    /// Routing state for `origin`.
    pub fn routing_state(&self, origin: u16) -> ConsentState {
        self.slots
            .get(&origin)
            .map(|slot| slot.manager.routing_state())
            .unwrap_or(ConsentState::SuspendedConsent)
    }

    /// Manager for `origin`, if tracked.
    pub fn manager(&self, origin: u16) -> Option<&TransitionManager> {
        self.slots.get(&origin).map(|slot| &slot.manager)
    }

    /// Stop tracking `origin`, returning its state.
    pub fn remove(&mut self, origin: u16) -> Option<SessionSlot> {
        self.slots.remove(&origin)
    }

    /// Insert a slot directly, evicting if needed. Used when restoring.
    pub fn insert(&mut self, origin: u16, slot: SessionSlot) {
        if !self.slots.contains_key(&origin) && self.slots.len() >= MAX_SESSIONS {
            self.evict_oldest();
        }
        self.slots.insert(origin, slot);
    }

    /// Number of tracked origins.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no origins are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over all `(origin, slot)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &SessionSlot)> {
        self.slots.iter().map(|(origin, slot)| (*origin, slot))
    }

    /// Configuration for new sessions.
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    fn get_or_create(&mut self, origin: u16) -> &mut SessionSlot {
        if !self.slots.contains_key(&origin) && self.slots.len() >= MAX_SESSIONS {
            self.evict_oldest();
        }
        let config = &self.config;
        self.slots.entry(origin).or_insert_with(|| SessionSlot {
            manager: TransitionManager::new(config.clone()),
            last_active: 0,
        })
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.last_active)
            .map(|(origin, _)| *origin)
        {
            tracing::debug!(origin = oldest, "evicting idle session");
            self.slots.remove(&oldest);
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

impl core::fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionTable")
            .field("session_count", &self.slots.len())
            .field("config", &self.config)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
