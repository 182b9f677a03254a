/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Consent states and the somatic/verbal classifier.
//!
//! Five ordered states, most permissive first:
//!
//! ```text
//! somatic  15 ────────── 10 │ 9 ── 7 │    6     │ 5 ──────── 0
//!          FULL_CONSENT     │ ATTENTIVE│ DIMINISHED│ SUSPENDED
//!                           │          │ (verbal≥2 → ATTENTIVE)
//! EMERGENCY_OVERRIDE: never derived from signals; set by the emergency gate.
//! ```
//!
//! EMERGENCY_OVERRIDE is a system lockdown, not extra privilege: it sits at
//! the least permissive end of the ordering.

use core::fmt;

use crate::constants::{
    ATTENTIVE_THRESHOLD_4BIT, DIMINISHED_THRESHOLD_4BIT, FULL_THRESHOLD_4BIT, VERBAL_BOOST_MIN,
};

// ─── ConsentState ───────────────────────────────────────────────────────────

/// Ordered consent state. `Ord` follows the ordinal: lower is more permissive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ConsentState {
    /// Full operation, every sector reachable.
    FullConsent = 0,
    /// Early engagement, preliminary routing.
    Attentive = 1,
    /// Reconfirmation required, reduced sectors.
    DiminishedConsent = 2,
    /// Blocked down to the minimal sectors.
    SuspendedConsent = 3,
    /// System lockdown, GUARDIAN only.
    EmergencyOverride = 4,
}

impl ConsentState {
    /// All states in ordinal order.
    pub const ALL: [ConsentState; 5] = [
        ConsentState::FullConsent,
        ConsentState::Attentive,
        ConsentState::DiminishedConsent,
        ConsentState::SuspendedConsent,
        ConsentState::EmergencyOverride,
    ];

    /// Ordinal value, 0 (most permissive) to 4.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// State for an ordinal, `None` above 4.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Canonical upper-snake-case name.
    pub fn name(&self) -> &'static str {
        match self {
            ConsentState::FullConsent => "FULL_CONSENT",
            ConsentState::Attentive => "ATTENTIVE",
            ConsentState::DiminishedConsent => "DIMINISHED_CONSENT",
            ConsentState::SuspendedConsent => "SUSPENDED_CONSENT",
            ConsentState::EmergencyOverride => "EMERGENCY_OVERRIDE",
        }
    }

    /// `true` for the emergency lockdown state.
    pub fn is_lockdown(&self) -> bool {
        matches!(self, ConsentState::EmergencyOverride)
    }

    /// Direction of a move from `self` to `target`.
    pub fn direction_to(self, target: ConsentState) -> TransitionDirection {
        match target.ordinal().cmp(&self.ordinal()) {
            core::cmp::Ordering::Less => TransitionDirection::Upgrade,
            core::cmp::Ordering::Greater => TransitionDirection::Downgrade,
            core::cmp::Ordering::Equal => TransitionDirection::None,
        }
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a consent state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionDirection {
    /// Same state.
    None,
    /// Toward a lower ordinal (more permissive). Gated by dwell.
    Upgrade,
    /// Toward a higher ordinal (less permissive). Always immediate.
    Downgrade,
}

// ─── Classifier ─────────────────────────────────────────────────────────────

/// Derive a consent state from the raw 4-bit somatic and 2-bit verbal fields.
///
/// - somatic ≥ 10 → FULL_CONSENT
/// - somatic 7..=9 → ATTENTIVE
/// - somatic 6 → ATTENTIVE when verbal ≥ 2, else DIMINISHED_CONSENT
/// - somatic < 6 → SUSPENDED_CONSENT, whatever the verbal strength
///
/// Out-of-width inputs are not rejected: any somatic above 15 still classifies
/// as full consent.
pub fn derive_consent_state(somatic: u8, verbal: u8) -> ConsentState {
    if somatic >= FULL_THRESHOLD_4BIT {
        ConsentState::FullConsent
    } else if somatic >= ATTENTIVE_THRESHOLD_4BIT {
        ConsentState::Attentive
    } else if somatic >= DIMINISHED_THRESHOLD_4BIT {
        if verbal >= VERBAL_BOOST_MIN {
            ConsentState::Attentive
        } else {
            ConsentState::DiminishedConsent
        }
    } else {
        ConsentState::SuspendedConsent
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
