//! Snapshot persistence through serde_json.

#![cfg(feature = "serde")]

use rpp_core::snapshot::{TableSnapshot, TransitionSnapshot, SNAPSHOT_VERSION};
use rpp_core::ConsentState::*;
use rpp_core::{SessionTable, SnapshotError, TransitionManager};

fn mid_climb_manager() -> TransitionManager {
    let mut m = TransitionManager::default();
    m.tick(Attentive, 400, false);
    for _ in 0..11 {
        m.tick(FullConsent, 60, false);
    }
    m
}

#[test]
fn test_transition_snapshot_json_round_trip() {
    let snap = TransitionSnapshot::from_manager(&mid_climb_manager());
    let json = serde_json::to_string(&snap).unwrap();
    let back: TransitionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
    assert_eq!(back.version, SNAPSHOT_VERSION);
}

#[test]
fn test_restored_manager_resumes_mid_climb() {
    let mut original = mid_climb_manager();
    let json = serde_json::to_string(&TransitionSnapshot::from_manager(&original)).unwrap();
    let mut restored = serde_json::from_str::<TransitionSnapshot>(&json)
        .unwrap()
        .restore()
        .unwrap();

    // Eleven poor ticks banked; the fallback gate fires two ticks after restore.
    for _ in 0..10 {
        let a = original.tick(FullConsent, 60, false);
        let b = restored.tick(FullConsent, 60, false);
        assert_eq!(a, b);
    }
    assert!(restored.is_fallback_triggered());
    assert_eq!(restored.routing_state(), SuspendedConsent);
}

#[test]
fn test_future_version_is_rejected() {
    let snap = TransitionSnapshot::from_manager(&TransitionManager::default());
    let mut value = serde_json::to_value(&snap).unwrap();
    value["version"] = serde_json::json!(SNAPSHOT_VERSION + 1);
    let future: TransitionSnapshot = serde_json::from_value(value).unwrap();
    assert_eq!(
        future.restore().unwrap_err(),
        SnapshotError::UnsupportedVersion {
            found: SNAPSHOT_VERSION + 1,
            expected: SNAPSHOT_VERSION
        }
    );
}

#[test]
fn test_table_snapshot_json_round_trip() {
    let mut table = SessionTable::default();
    for now in 0..4 {
        table.tick(0x0010, FullConsent, 500, false, now);
        table.tick(0x0020, DiminishedConsent, 500, false, now);
    }
    table.tick(0x0030, Attentive, 20, true, 7);

    let snap = TableSnapshot::from_table(&table, 1_000);
    let json = serde_json::to_string_pretty(&snap).unwrap();
    let back: TableSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
    assert_eq!(back.taken_at, 1_000);
    assert_eq!(back.session_count(), 3);

    let restored = back.restore().unwrap();
    for origin in [0x0010, 0x0020, 0x0030] {
        assert_eq!(restored.manager(origin), table.manager(origin));
        assert_eq!(restored.routing_state(origin), table.routing_state(origin));
    }
}

#[test]
fn test_table_restore_checks_every_session_version() {
    let mut table = SessionTable::default();
    table.tick(0x0010, Attentive, 500, false, 3);
    let mut snap = TableSnapshot::from_table(&table, 4);
    snap.sessions[0].transition.version = SNAPSHOT_VERSION + 1;

    let json = serde_json::to_string(&snap).unwrap();
    let back: TableSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(
        back.restore().unwrap_err(),
        SnapshotError::UnsupportedVersion {
            found: SNAPSHOT_VERSION + 1,
            expected: SNAPSHOT_VERSION
        }
    );
}
