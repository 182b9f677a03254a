/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Sector router: consent-gated access to the nine routable sectors.
//!
//! | State | Reachable |
//! |---|---|
//! | FULL_CONSENT | all nine (VOID still needs coherence 0) |
//! | ATTENTIVE | MEMORY, WITNESS, BRIDGE, GUARDIAN |
//! | DIMINISHED_CONSENT | BRIDGE, GUARDIAN, SHADOW |
//! | SUSPENDED_CONSENT | BRIDGE, GUARDIAN |
//! | EMERGENCY_OVERRIDE | GUARDIAN |
//!
//! Two special cases sit above the table: VOID is reachable iff coherence is
//! exactly 0, and GUARDIAN is always reachable. Denied requests may fall back
//! along [`FALLBACK_CHAIN`]; since GUARDIAN is always reachable the chain
//! always terminates.

use core::fmt;

use crate::consent::ConsentState;

// ─── RoutableSector ─────────────────────────────────────────────────────────

/// One of nine logical routing destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RoutableSector {
    /// Reset / phase collapse. Coherence 0 only.
    Void = 0,
    /// Essential identity.
    Core = 1,
    /// Inherited material.
    Gene = 2,
    /// Learned experience.
    Memory = 3,
    /// Present-moment awareness.
    Witness = 4,
    /// Aspirational.
    Dream = 5,
    /// Relational.
    Bridge = 6,
    /// Protective. The terminal fallback.
    Guardian = 7,
    /// Unintegrated.
    Shadow = 8,
}

impl RoutableSector {
    /// All sectors in discriminant order.
    pub const ALL: [RoutableSector; 9] = [
        RoutableSector::Void,
        RoutableSector::Core,
        RoutableSector::Gene,
        RoutableSector::Memory,
        RoutableSector::Witness,
        RoutableSector::Dream,
        RoutableSector::Bridge,
        RoutableSector::Guardian,
        RoutableSector::Shadow,
    ];

    /// Sector for a discriminant, `None` above 8.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            RoutableSector::Void => "VOID",
            RoutableSector::Core => "CORE",
            RoutableSector::Gene => "GENE",
            RoutableSector::Memory => "MEMORY",
            RoutableSector::Witness => "WITNESS",
            RoutableSector::Dream => "DREAM",
            RoutableSector::Bridge => "BRIDGE",
            RoutableSector::Guardian => "GUARDIAN",
            RoutableSector::Shadow => "SHADOW",
        }
    }

    /// Sensitivity level, 0 (none) to 5 (most restricted).
    pub fn sensitivity(&self) -> u8 {
        match self {
            RoutableSector::Void => 0,
            RoutableSector::Bridge | RoutableSector::Guardian => 1,
            RoutableSector::Shadow => 2,
            RoutableSector::Memory | RoutableSector::Witness => 3,
            RoutableSector::Dream => 4,
            RoutableSector::Gene | RoutableSector::Core => 5,
        }
    }

    /// `true` for sectors only FULL_CONSENT can reach: CORE, GENE, DREAM.
    pub fn requires_full_consent(&self) -> bool {
        matches!(
            self,
            RoutableSector::Core | RoutableSector::Gene | RoutableSector::Dream
        )
    }

    /// `true` when every consent state can reach the sector.
    pub fn is_universal_access(&self) -> bool {
        ConsentState::ALL
            .iter()
            .all(|&state| can_access(state, *self, 1))
    }

    /// Map a legacy 0–7 theta index (CORE = 0) to a sector.
    pub fn from_legacy_index(index: u8) -> Option<Self> {
        if index > 7 {
            return None;
        }
        Self::from_u8(index + 1)
    }

    /// Legacy 0–7 theta index. VOID has none.
    pub fn to_legacy_index(&self) -> Option<u8> {
        match self {
            RoutableSector::Void => None,
            other => Some(*other as u8 - 1),
        }
    }
}

impl fmt::Display for RoutableSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── SectorSet ──────────────────────────────────────────────────────────────

/// Immutable set of sectors packed into a bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SectorSet(u16);

impl SectorSet {
    /// Empty set.
    pub const EMPTY: SectorSet = SectorSet(0);

    /// Set holding exactly `sectors`.
    pub const fn of(sectors: &[RoutableSector]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < sectors.len() {
            bits |= 1 << sectors[i] as u16;
            i += 1;
        }
        SectorSet(bits)
    }

    /// Whether `sector` is a member.
    pub const fn contains(&self, sector: RoutableSector) -> bool {
        self.0 & (1 << sector as u16) != 0
    }

    /// Number of members.
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Raw bitmask, bit `n` for discriminant `n`.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Members in discriminant order.
    pub fn iter(&self) -> impl Iterator<Item = RoutableSector> + '_ {
        RoutableSector::ALL
            .into_iter()
            .filter(move |s| self.contains(*s))
    }
}

use RoutableSector::{Bridge, Core, Dream, Gene, Guardian, Memory, Shadow, Void, Witness};

const FULL_ACCESS: SectorSet =
    SectorSet::of(&[Void, Core, Gene, Memory, Witness, Dream, Bridge, Guardian, Shadow]);
const ATTENTIVE_ACCESS: SectorSet = SectorSet::of(&[Memory, Witness, Bridge, Guardian]);
const DIMINISHED_ACCESS: SectorSet = SectorSet::of(&[Bridge, Guardian, Shadow]);
const SUSPENDED_ACCESS: SectorSet = SectorSet::of(&[Bridge, Guardian]);
const EMERGENCY_ACCESS: SectorSet = SectorSet::of(&[Guardian]);

/// Redirect order for denied requests.
pub const FALLBACK_CHAIN: [RoutableSector; 2] = [Guardian, Bridge];

/// Sectors `state` may reach, before the VOID and GUARDIAN special cases.
pub fn accessible_sectors(state: ConsentState) -> SectorSet {
    match state {
        ConsentState::FullConsent => FULL_ACCESS,
        ConsentState::Attentive => ATTENTIVE_ACCESS,
        ConsentState::DiminishedConsent => DIMINISHED_ACCESS,
        ConsentState::SuspendedConsent => SUSPENDED_ACCESS,
        ConsentState::EmergencyOverride => EMERGENCY_ACCESS,
    }
}

/// Whether `state` may reach `sector` at the given coherence score.
pub fn can_access(state: ConsentState, sector: RoutableSector, coherence: u16) -> bool {
    match sector {
        Void => coherence == 0,
        Guardian => true,
        other => accessible_sectors(state).contains(other),
    }
}

/// First sector of [`FALLBACK_CHAIN`] that `state` may reach, or `requested`
/// itself when it is already reachable at full coherence.
pub fn fallback_sector(state: ConsentState, requested: RoutableSector) -> RoutableSector {
    if requested != Void && can_access(state, requested, u16::MAX) {
        return requested;
    }
    let accessible = accessible_sectors(state);
    FALLBACK_CHAIN
        .into_iter()
        .find(|s| accessible.contains(*s))
        .unwrap_or(Guardian)
}

// ─── RoutingDecision ────────────────────────────────────────────────────────

/// Why a routing decision came out the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoutingReason {
    /// Coherence 0 opened VOID.
    VoidAtZeroCoherence,
    /// VOID requested at non-zero coherence and redirected.
    VoidRedirected {
        /// Sector used instead.
        fallback: RoutableSector,
    },
    /// VOID requested at non-zero coherence, no fallback allowed.
    VoidDenied,
    /// The consent state reaches the sector directly.
    Granted {
        /// Deciding state.
        state: ConsentState,
    },
    /// Denied by the consent state and redirected.
    Redirected {
        /// Deciding state.
        state: ConsentState,
        /// Sector used instead.
        fallback: RoutableSector,
    },
    /// Denied by the consent state, no fallback allowed.
    Denied {
        /// Deciding state.
        state: ConsentState,
    },
}

/// Outcome of [`route_to_sector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingDecision {
    /// Whether the packet may proceed.
    pub granted: bool,
    /// Sector the packet goes to (the request itself when denied).
    pub sector: RoutableSector,
    /// Sector originally requested.
    pub original_sector: RoutableSector,
    /// Why.
    pub reason: RoutingReason,
}

impl RoutingDecision {
    /// `true` when the packet was sent somewhere other than requested.
    pub fn redirected(&self) -> bool {
        self.sector != self.original_sector
    }
}

impl fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingReason::VoidAtZeroCoherence => f.write_str("coherence=0 enables VOID access"),
            RoutingReason::VoidRedirected { fallback } => {
                write!(f, "VOID requires coherence=0, redirected to {}", fallback)
            }
            RoutingReason::VoidDenied => f.write_str("VOID requires coherence=0"),
            RoutingReason::Granted { state } => write!(f, "{} grants access", state),
            RoutingReason::Redirected { state, fallback } => {
                write!(f, "{} denies access, redirected to {}", state, fallback)
            }
            RoutingReason::Denied { state } => write!(f, "{} denies access", state),
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.granted { "GRANTED" } else { "DENIED" };
        if self.redirected() {
            write!(f, "{}: {} -> {} ({})", status, self.original_sector, self.sector, self.reason)
        } else {
            write!(f, "{}: {} ({})", status, self.sector, self.reason)
        }
    }
}

/// Decide where a packet asking for `requested` goes.
///
/// Direct access grants the request. Otherwise, with `allow_fallback`, the
/// request is granted on the first reachable sector of [`FALLBACK_CHAIN`];
/// without it the request is denied.
pub fn route_to_sector(
    state: ConsentState,
    requested: RoutableSector,
    coherence: u16,
    allow_fallback: bool,
) -> RoutingDecision {
    let decision = if can_access(state, requested, coherence) {
        RoutingDecision {
            granted: true,
            sector: requested,
            original_sector: requested,
            reason: if requested == Void {
                RoutingReason::VoidAtZeroCoherence
            } else {
                RoutingReason::Granted { state }
            },
        }
    } else if allow_fallback {
        let fallback = fallback_sector(state, requested);
        RoutingDecision {
            granted: true,
            sector: fallback,
            original_sector: requested,
            reason: if requested == Void {
                RoutingReason::VoidRedirected { fallback }
            } else {
                RoutingReason::Redirected { state, fallback }
            },
        }
    } else {
        RoutingDecision {
            granted: false,
            sector: requested,
            original_sector: requested,
            reason: if requested == Void {
                RoutingReason::VoidDenied
            } else {
                RoutingReason::Denied { state }
            },
        }
    };

    tracing::trace!(
        state = state.name(),
        requested = requested.name(),
        sector = decision.sector.name(),
        granted = decision.granted,
        redirected = decision.redirected(),
        "routing decision"
    );
    decision
}

// ─── Tests ──────────────────────────────────────────────────────────────────
