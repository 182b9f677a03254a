/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! One session's end-to-end pipeline: bytes → header → consent state →
//! transition tick → routing decision → audit record.
//!
//! A [`ConsentSession`] exclusively owns its [`TransitionManager`]. Sessions
//! share nothing, so independent sessions may be driven from independent
//! threads; ticks for a single session must be serialised by its owner.
//!
//! Persisting resolved routes is left to an [`AuditLedger`] supplied by the
//! caller. The core never stores them.

use crate::coherence::{score, CoherenceResult};
use crate::consent::ConsentState;
use crate::error::HeaderError;
use crate::header::{ConsentHeader, SpiralPacket, Violations};
use crate::sector::{route_to_sector, RoutableSector, RoutingDecision};
use crate::transition::{TickResult, TransitionConfig, TransitionManager};

// ─── AuditLedger ────────────────────────────────────────────────────────────

/// One finalised routing decision, as handed to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditEntry {
    /// Consent state the decision was made under.
    pub state: ConsentState,
    /// Coherence score at decision time.
    pub coherence: u16,
    /// Caller-supplied timestamp.
    pub timestamp: u64,
    /// Sector requested.
    pub requested: RoutableSector,
    /// Sector resolved.
    pub sector: RoutableSector,
    /// Whether the route was granted.
    pub granted: bool,
}

/// Sink for finalised routing decisions.
///
/// Implementations decide storage and retention. Recording must not fail the
/// routing path; a ledger that can fail should buffer or drop internally.
pub trait AuditLedger {
    /// Record one decision.
    fn record(&mut self, entry: AuditEntry);
}

/// Discards every entry.
impl AuditLedger for () {
    fn record(&mut self, _entry: AuditEntry) {}
}

impl<L: AuditLedger + ?Sized> AuditLedger for &mut L {
    fn record(&mut self, entry: AuditEntry) {
        (**self).record(entry);
    }
}

/// Bounded ring: once full, the oldest entry is dropped.
impl<const N: usize> AuditLedger for heapless::Deque<AuditEntry, N> {
    fn record(&mut self, entry: AuditEntry) {
        if self.is_full() {
            self.pop_front();
        }
        let _ = self.push_back(entry);
    }
}

#[cfg(feature = "std")]
impl AuditLedger for std::vec::Vec<AuditEntry> {
    fn record(&mut self, entry: AuditEntry) {
        self.push(entry);
    }
}

// ─── ConsentSession ─────────────────────────────────────────────────────────

/// Everything [`ConsentSession::process_packet`] learned about one packet.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketOutcome {
    /// Decoded header.
    pub header: ConsentHeader,
    /// Semantic violations. Reported, not enforced.
    pub violations: Violations,
    /// Coherence evaluation for this tick.
    pub coherence: CoherenceResult,
    /// Transition tick result.
    pub tick: TickResult,
    /// Routing decision.
    pub decision: RoutingDecision,
}

/// A session: one transition manager plus the ledger its decisions go to.
#[derive(Debug)]
pub struct ConsentSession<L: AuditLedger = ()> {
    manager: TransitionManager,
    ledger: L,
}

impl ConsentSession<()> {
    /// Session with the reference timing and no ledger.
    pub fn unaudited() -> Self {
        Self::new(TransitionConfig::default(), ())
    }
}

impl<L: AuditLedger> ConsentSession<L> {
    /// Session with explicit timing and ledger.
    pub fn new(config: TransitionConfig, ledger: L) -> Self {
        Self {
            manager: TransitionManager::new(config),
            ledger,
        }
    }

    /// Tick the transition manager with the state carried by `header`.
    pub fn observe(
        &mut self,
        header: &ConsentHeader,
        coherence: &CoherenceResult,
        is_emergency: bool,
    ) -> TickResult {
        self.manager
            .tick(header.consent_state(), coherence.score, is_emergency)
    }

    /// State that gates routing. See [`TransitionManager::routing_state`].
    pub fn routing_state(&self) -> ConsentState {
        self.manager.routing_state()
    }

    /// Route under [`Self::routing_state`] and record the decision.
    pub fn route(
        &mut self,
        requested: RoutableSector,
        coherence: u16,
        allow_fallback: bool,
        timestamp: u64,
    ) -> RoutingDecision {
        let state = self.routing_state();
        let decision = route_to_sector(state, requested, coherence, allow_fallback);
        self.ledger.record(AuditEntry {
            state,
            coherence,
            timestamp,
            requested,
            sector: decision.sector,
            granted: decision.granted,
        });
        decision
    }

    /// Decode, validate, score, tick and route one frame.
    ///
    /// `bytes` is a header optionally followed by payload. A header asking for
    /// fallback (phase entropy above 25) enables fallback routing regardless
    /// of `allow_fallback`. Codec errors are returned before any state changes.
    #[allow(clippy::too_many_arguments)]
    pub fn process_packet(
        &mut self,
        bytes: &[u8],
        engagement: f64,
        completion: f64,
        is_emergency: bool,
        requested: RoutableSector,
        allow_fallback: bool,
        timestamp: u64,
    ) -> Result<PacketOutcome, HeaderError> {
        let packet = SpiralPacket::parse(bytes)?;
        let header = packet.header;
        let violations = header.validate();
        if !violations.is_empty() {
            tracing::debug!(
                origin = header.origin_ref,
                count = violations.len(),
                "header failed validation"
            );
        }

        let coherence = score(engagement, completion);
        let tick = self.observe(&header, &coherence, is_emergency);
        let decision = self.route(
            requested,
            coherence.score,
            allow_fallback || header.needs_fallback(),
            timestamp,
        );

        Ok(PacketOutcome {
            header,
            violations,
            coherence,
            tick,
            decision,
        })
    }

    /// Transition manager.
    pub fn manager(&self) -> &TransitionManager {
        &self.manager
    }

    /// Ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Reset the transition state. The ledger is untouched.
    pub fn reset(&mut self) {
        self.manager.reset();
    }

    /// Give back the ledger.
    pub fn into_ledger(self) -> L {
        self.ledger
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
