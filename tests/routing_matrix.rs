//! Exhaustive routing matrix: every consent state against every sector.

use rpp_core::sector::{accessible_sectors, fallback_sector, FALLBACK_CHAIN};
use rpp_core::ConsentState::{self, *};
use rpp_core::RoutableSector::{self, *};
use rpp_core::{can_access, route_to_sector, RoutingReason};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// Expected reachability at a non-zero coherence, straight from the access table.
fn expected(state: ConsentState, sector: RoutableSector) -> bool {
    let row: &[RoutableSector] = match state {
        FullConsent => &[Core, Gene, Memory, Witness, Dream, Bridge, Guardian, Shadow],
        Attentive => &[Memory, Witness, Bridge, Guardian],
        DiminishedConsent => &[Bridge, Guardian, Shadow],
        SuspendedConsent => &[Bridge, Guardian],
        EmergencyOverride => &[Guardian],
    };
    row.contains(&sector)
}

// ─── matrix ──────────────────────────────────────────────────────────────────

#[test]
fn test_access_matrix_at_positive_coherence() {
    for state in ConsentState::ALL {
        for sector in RoutableSector::ALL {
            assert_eq!(
                can_access(state, sector, 300),
                expected(state, sector),
                "{} -> {}",
                state,
                sector
            );
        }
    }
}

#[test]
fn test_void_row_at_zero_coherence() {
    for state in ConsentState::ALL {
        let d = route_to_sector(state, Void, 0, false);
        assert!(d.granted, "{}", state);
        assert_eq!(d.sector, Void);
        assert_eq!(d.reason, RoutingReason::VoidAtZeroCoherence);
    }
}

#[test]
fn test_fallback_always_grants_a_reachable_sector() {
    for state in ConsentState::ALL {
        for sector in RoutableSector::ALL {
            for coherence in [0u16, 1, 137, 674] {
                let d = route_to_sector(state, sector, coherence, true);
                assert!(d.granted);
                assert!(can_access(state, d.sector, coherence));
                if d.redirected() {
                    assert!(FALLBACK_CHAIN.contains(&d.sector));
                    assert_eq!(d.original_sector, sector);
                }
            }
        }
    }
}

#[test]
fn test_without_fallback_denial_matches_matrix() {
    for state in ConsentState::ALL {
        for sector in RoutableSector::ALL {
            let d = route_to_sector(state, sector, 300, false);
            assert_eq!(d.granted, expected(state, sector));
            assert!(!d.redirected());
        }
    }
}

#[test]
fn test_fallback_prefers_guardian() {
    for state in ConsentState::ALL {
        assert!(accessible_sectors(state).contains(Guardian));
        assert_eq!(fallback_sector(state, Core), if state == FullConsent { Core } else { Guardian });
    }
}

// ─── reference decisions ─────────────────────────────────────────────────────

#[test]
fn test_emergency_core_redirects_to_guardian() {
    let d = route_to_sector(EmergencyOverride, Core, 500, true);
    assert!(d.granted);
    assert_eq!(d.sector, Guardian);
    assert!(d.redirected());
    assert_eq!(
        d.reason.to_string(),
        "EMERGENCY_OVERRIDE denies access, redirected to GUARDIAN"
    );
}

#[test]
fn test_void_zero_versus_one() {
    let at_zero = route_to_sector(FullConsent, Void, 0, true);
    assert!(at_zero.granted);
    assert_eq!(at_zero.sector, Void);
    assert!(!at_zero.redirected());

    let at_one = route_to_sector(FullConsent, Void, 1, true);
    assert!(at_one.granted);
    assert!(at_one.redirected());
    assert!(matches!(at_one.sector, Guardian | Bridge));
}

#[test]
fn test_decision_display() {
    let d = route_to_sector(DiminishedConsent, Memory, 300, true);
    assert_eq!(
        d.to_string(),
        "GRANTED: MEMORY -> GUARDIAN (DIMINISHED_CONSENT denies access, redirected to GUARDIAN)"
    );
    let denied = route_to_sector(DiminishedConsent, Memory, 300, false);
    assert_eq!(
        denied.to_string(),
        "DENIED: MEMORY (DIMINISHED_CONSENT denies access)"
    );
}
