//! # Consent Session Simulation
//!
//! Drives one session through a scripted afternoon: a cautious start, a slow
//! climb to full consent, a stretch of poor coherence, a distress episode and
//! recovery. Every tick encodes a real 18-byte header and routes a request
//! for the sector the sender is trying to reach.

use rpp_core::header::{ConsentHeader, PayloadType, HEADER_SIZE};
use rpp_core::{AuditEntry, ConsentSession, HeaderError, RoutableSector, TransitionConfig};

// ── Script ───────────────────────────────────────────────────────────────────

struct Phase {
    label: &'static str,
    ticks: u64,
    somatic: u8,
    verbal: u8,
    engagement: f64,
    completion: f64,
    emergency: bool,
    wants: RoutableSector,
}

const SCRIPT: &[Phase] = &[
    Phase { label: "arrival",      ticks: 4,  somatic: 6,  verbal: 1, engagement: 0.4,  completion: 0.3, emergency: false, wants: RoutableSector::Memory },
    Phase { label: "warming up",   ticks: 6,  somatic: 8,  verbal: 2, engagement: 0.6,  completion: 0.5, emergency: false, wants: RoutableSector::Memory },
    Phase { label: "open",         ticks: 22, somatic: 13, verbal: 3, engagement: 0.9,  completion: 0.8, emergency: false, wants: RoutableSector::Dream  },
    Phase { label: "drifting",     ticks: 14, somatic: 13, verbal: 3, engagement: 0.05, completion: 0.1, emergency: false, wants: RoutableSector::Dream  },
    Phase { label: "distress",     ticks: 10, somatic: 2,  verbal: 0, engagement: 0.7,  completion: 0.2, emergency: true,  wants: RoutableSector::Core   },
    Phase { label: "settling",     ticks: 6,  somatic: 5,  verbal: 1, engagement: 0.5,  completion: 0.4, emergency: false, wants: RoutableSector::Bridge },
];

// ── Display helpers ──────────────────────────────────────────────────────────

fn bar(score: u16) -> String {
    let filled = (score as usize * 20) / 674;
    format!("[{}{}] {:>3}", "█".repeat(filled), "░".repeat(20 - filled), score)
}

fn frame(ts: u64, p: &Phase) -> Result<[u8; HEADER_SIZE], HeaderError> {
    let trace = if p.somatic < 6 { 1 } else { 0 };
    let header = ConsentHeader::new(0x5E55_0001)
        .with_identity(ts as u32, 0x0042)
        .with_consent(p.somatic, p.verbal)
        .with_entropy(if p.emergency { 28 } else { 4 }, trace)
        .with_payload_type(PayloadType::Heartbeat);
    header.encode()
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<(), HeaderError> {
    let mut ledger: Vec<AuditEntry> = Vec::new();
    let mut session = ConsentSession::new(TransitionConfig::default(), &mut ledger);
    let mut ts = 0u64;

    println!("tick  phase        detected              current               routed");
    println!("────  ───────────  ────────────────────  ────────────────────  ─────────────────────────");

    for phase in SCRIPT {
        for _ in 0..phase.ticks {
            let bytes = frame(ts, phase)?;
            let out = session.process_packet(
                &bytes,
                phase.engagement,
                phase.completion,
                phase.emergency,
                phase.wants,
                true,
                ts,
            )?;

            let mut flags = String::new();
            if out.tick.transition_granted && out.tick.dwell_cycles == 1 {
                flags.push_str(" *");
            }
            if out.tick.fallback_triggered {
                flags.push_str(" khat");
            }
            if out.tick.emergency_active {
                flags.push_str(" etf");
            }

            println!(
                "{ts:>4}  {:<11}  {:<20}  {:<20}  {}{}",
                phase.label,
                out.tick.detected_state.name(),
                out.tick.current_state.name(),
                out.decision,
                flags,
            );
            if ts % 8 == 0 {
                println!("      coherence {}", bar(out.coherence.score));
            }
            ts += 1;
        }
    }
    drop(session);

    let redirected = ledger.iter().filter(|e| e.sector != e.requested).count();
    println!();
    println!("{} decisions recorded, {} redirected", ledger.len(), redirected);
    for sector in RoutableSector::ALL {
        let hits = ledger.iter().filter(|e| e.sector == sector).count();
        if hits > 0 {
            println!("  {:<9} {}", sector.name(), hits);
        }
    }
    Ok(())
}
