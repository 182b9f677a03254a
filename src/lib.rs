/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! # rpp-core
//!
//! Consent-gated routing. A packed consent header and a coherence scorer feed
//! the transition dynamics that decide which sectors a packet may reach.
//!
//! ---
//!
//! ## Losing consent is instant. Gaining it is earned.
//!
//! Every packet carries an 18-byte header with the sender's somatic and verbal
//! consent signals. A classifier turns those into one of five ordered states,
//! but the router never sees that raw reading. It sees the state after four
//! gates have had their say:
//!
//! **Dwell.** Upgrades must be requested continuously before they take effect
//! (19 ticks to reach FULL_CONSENT). Downgrades apply on the same tick.
//!
//! **Reflection.** A detected change is exposed downstream only after a fixed
//! delay, so flicker never leaves the session.
//!
//! **Fallback.** More than 12 consecutive ticks of low coherence cap the
//! session at SUSPENDED_CONSENT until coherence recovers.
//!
//! **Emergency.** 9 consecutive ticks of an emergency condition lock the
//! session to GUARDIAN.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! bytes[18] → ConsentHeader → ConsentState → TransitionManager → RoutableSector
//!                  ↑               ↑                ↑                  ↑
//!               crc8()    derive_consent_state  CoherenceResult   route_to_sector
//!                                               (score())
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`constants`] | | Reference weights, thresholds and durations |
//! | [`coherence`] | [`CoherenceResult`], [`CompletionStage`] | Integer coherence score 0–674 |
//! | [`consent`] | [`ConsentState`] | Five ordered states and the somatic/verbal classifier |
//! | [`header`] | [`ConsentHeader`], [`SpiralPacket`] | Bit-exact 18-byte codec with CRC-8 |
//! | [`transition`] | [`TransitionManager`], [`TickResult`] | Dwell, reflection, fallback and emergency gates |
//! | [`sector`] | [`RoutableSector`], [`RoutingDecision`] | Consent-gated sector access with fallback chain |
//! | [`session`] | [`ConsentSession`], [`AuditLedger`] | One session end to end |
//! | [`table`] | [`SessionTable`] | Bounded per-origin session map |
//! | [`snapshot`] | `TransitionSnapshot` | Serialisable state capture (requires `serde` feature) |
//! | [`error`] | [`HeaderError`], [`ValidationError`] | Codec and validation errors |
//!
//! ## Quick start
//!
//! ```
//! use rpp_core::{score, ConsentHeader, RoutableSector, TransitionManager, route_to_sector};
//!
//! let bytes = ConsentHeader::new(0x0001_0203).with_consent(12, 2).encode()?;
//! let header = ConsentHeader::decode(&bytes)?;
//!
//! let coherence = score(0.8, 0.9);
//! let mut manager = TransitionManager::default();
//! let tick = manager.tick(header.consent_state(), coherence.score, false);
//!
//! let decision = route_to_sector(tick.current_state, RoutableSector::Memory, coherence.score, true);
//! assert!(decision.granted);
//! # Ok::<(), rpp_core::HeaderError>(())
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default with no heap required. Enable the `std`
//! feature for `Vec`-backed helpers. Enable the `serde` feature for serialisation
//! support (required for the `snapshot` module).
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(any(feature = "std", feature = "python-ffi"))]
extern crate std;

pub mod coherence;
pub mod consent;
pub mod constants;
pub mod error;
pub mod header;
pub mod sector;
pub mod session;
pub mod table;
pub mod transition;

#[cfg(feature = "serde")]
pub mod snapshot;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use coherence::{score, CoherenceResult, CompletionStage};
pub use consent::{derive_consent_state, ConsentState, TransitionDirection};
pub use error::{HeaderError, SnapshotError, ValidationError};
pub use header::{decode, encode, ConsentHeader, SpiralPacket, HEADER_SIZE};
pub use sector::{can_access, route_to_sector, RoutableSector, RoutingDecision, RoutingReason};
pub use session::{AuditEntry, AuditLedger, ConsentSession, PacketOutcome};
pub use table::SessionTable;
pub use transition::{TickResult, TransitionConfig, TransitionManager};
