/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Portable snapshots of transition state for persistence and hand-over.
//!
//! A [`TransitionSnapshot`] captures one [`TransitionManager`] completely:
//! configuration, all four gates, the smoothing accumulator and the cycle
//! count. A [`TableSnapshot`] captures every session in a [`SessionTable`].
//! Restoring a snapshot yields a manager that behaves tick-for-tick like the
//! original.
//!
//! # no_std
//!
//! This module requires the `serde` feature. It uses `alloc::vec::Vec` and is
//! compatible with no_std + alloc environments.

extern crate alloc;

use alloc::vec::Vec;

use crate::consent::ConsentState;
use crate::error::SnapshotError;
use crate::table::{SessionSlot, SessionTable};
use crate::transition::{TransitionConfig, TransitionManager};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Serializable dwell timer state.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DwellRecord {
    /// Stable state.
    pub current: Option<ConsentState>,
    /// Ticks in the stable state.
    pub cycles_in_state: u32,
    /// Pending upgrade target.
    pub target: Option<ConsentState>,
    /// Ticks the target has been requested.
    pub cycles_at_target: u32,
}

/// Serializable reflector state.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReflectorRecord {
    /// Last detected state.
    pub detected: Option<ConsentState>,
    /// Last reflected state.
    pub reflected: Option<ConsentState>,
    /// Ticks since the last detected change.
    pub cycles_since_detection: u32,
    /// Whether a reflection is pending.
    pub pending: bool,
}

/// Serializable fallback gate state.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FallbackRecord {
    /// Consecutive below-threshold ticks.
    pub cycles_below: u32,
    /// Triggered flag.
    pub triggered: bool,
}

/// Serializable emergency gate state.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EmergencyRecord {
    /// Consecutive emergency ticks.
    pub emergency_cycles: u32,
    /// Lockdown flag.
    pub active: bool,
}

/// A serializable capture of one [`TransitionManager`].
///
/// # Example
///
/// ```rust,ignore
/// use rpp_core::snapshot::TransitionSnapshot;
///
/// let snapshot = TransitionSnapshot::from_manager(&manager);
/// let json = serde_json::to_string(&snapshot).unwrap();
/// let restored: TransitionSnapshot = serde_json::from_str(&json).unwrap();
/// let manager = restored.restore()?;
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct TransitionSnapshot {
    /// Format version, [`SNAPSHOT_VERSION`] for new snapshots.
    pub version: u16,
    /// Timing configuration.
    pub config: TransitionConfig,
    /// Dwell timer.
    pub dwell: DwellRecord,
    /// Reflector.
    pub reflector: ReflectorRecord,
    /// Fallback gate.
    pub fallback: FallbackRecord,
    /// Emergency gate.
    pub emergency: EmergencyRecord,
    /// RADEL accumulator in [0.0, 1.0].
    pub smoothed_somatic: f32,
    /// Cycle count.
    pub cycle: u64,
}

impl TransitionSnapshot {
    /// Capture `manager`.
    pub fn from_manager(manager: &TransitionManager) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config: manager.config.clone(),
            dwell: DwellRecord {
                current: manager.dwell.current,
                cycles_in_state: manager.dwell.cycles_in_state,
                target: manager.dwell.target,
                cycles_at_target: manager.dwell.cycles_at_target,
            },
            reflector: ReflectorRecord {
                detected: manager.reflector.detected,
                reflected: manager.reflector.reflected,
                cycles_since_detection: manager.reflector.cycles_since_detection,
                pending: manager.reflector.pending,
            },
            fallback: FallbackRecord {
                cycles_below: manager.fallback.cycles_below,
                triggered: manager.fallback.triggered,
            },
            emergency: EmergencyRecord {
                emergency_cycles: manager.emergency.emergency_cycles,
                active: manager.emergency.active,
            },
            smoothed_somatic: manager.smoothed_somatic,
            cycle: manager.cycle,
        }
    }

    /// Rebuild a manager from this snapshot.
    pub fn restore(&self) -> Result<TransitionManager, SnapshotError> {
        check_version(self.version)?;

        let mut manager = TransitionManager::new(self.config.clone());
        manager.dwell.current = self.dwell.current;
        manager.dwell.cycles_in_state = self.dwell.cycles_in_state;
        manager.dwell.target = self.dwell.target;
        manager.dwell.cycles_at_target = self.dwell.cycles_at_target;
        manager.reflector.detected = self.reflector.detected;
        manager.reflector.reflected = self.reflector.reflected;
        manager.reflector.cycles_since_detection = self.reflector.cycles_since_detection;
        manager.reflector.pending = self.reflector.pending;
        manager.fallback.cycles_below = self.fallback.cycles_below;
        manager.fallback.triggered = self.fallback.triggered;
        manager.emergency.emergency_cycles = self.emergency.emergency_cycles;
        manager.emergency.active = self.emergency.active;
        manager.smoothed_somatic = self.smoothed_somatic;
        manager.cycle = self.cycle;
        Ok(manager)
    }
}

/// One session entry in a [`TableSnapshot`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct SessionRecord {
    /// Origin reference.
    pub origin: u16,
    /// Caller clock value of the last tick.
    pub last_active: u64,
    /// Transition state.
    pub transition: TransitionSnapshot,
}

/// A serializable capture of a whole [`SessionTable`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct TableSnapshot {
    /// Format version.
    pub version: u16,
    /// Caller clock value when the snapshot was taken.
    pub taken_at: u64,
    /// Configuration for sessions created after restore.
    pub config: TransitionConfig,
    /// All tracked sessions, in iteration order.
    pub sessions: Vec<SessionRecord>,
}

impl TableSnapshot {
    /// Capture every session in `table`.
    pub fn from_table(table: &SessionTable, taken_at: u64) -> Self {
        let sessions = table
            .iter()
            .map(|(origin, slot)| SessionRecord {
                origin,
                last_active: slot.last_active,
                transition: TransitionSnapshot::from_manager(&slot.manager),
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            taken_at,
            config: table.config().clone(),
            sessions,
        }
    }

    /// Number of sessions captured.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Look up a session by origin.
    pub fn find_session(&self, origin: u16) -> Option<&SessionRecord> {
        self.sessions.iter().find(|r| r.origin == origin)
    }

    /// Rebuild the table.
    pub fn restore(&self) -> Result<SessionTable, SnapshotError> {
        check_version(self.version)?;
        let mut table = SessionTable::new(self.config.clone());
        for record in &self.sessions {
            table.insert(
                record.origin,
                SessionSlot {
                    manager: record.transition.restore()?,
                    last_active: record.last_active,
                },
            );
        }
        Ok(table)
    }
}

fn check_version(found: u16) -> Result<(), SnapshotError> {
    if found != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
