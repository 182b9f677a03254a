/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Reference constants shared by the scorer, classifier and transition gates.
//!
//! Every threshold and duration in the crate is derived from a small set of
//! scaled integers. They are fixed for the v2.0 wire layout; changing any of
//! them changes observable routing behaviour.
//!
//! | Constant | Value | Derivation |
//! |---|---|---|
//! | [`ENGAGEMENT_WEIGHT`] | 165 | φ scaled |
//! | [`COMPLETION_WEIGHT`] | 509 | Ankh scaled |
//! | [`MAX_COHERENCE`] | 674 | 165 + 509 |
//! | [`BINDING_NUMERATOR`] | 137 | ⌊α⁻¹⌋ |
//! | [`KHAT_DURATION`] | 12 | 316 mod 16 |
//! | [`ETF_DURATION`] | 9 | 137 mod 16 |
//! | [`DWELL_BASE`] | 3 | ⌈φ²⌉ |
//! | [`DWELL_FULL`] | 19 | ⌊φ·√α⁻¹⌉ |
//! | [`REFLECTION_DELAY`] | 4 | |

// ─── Coherence weights ──────────────────────────────────────────────────────

/// Weight applied to the engagement input (φ × 100, rounded to 165).
pub const ENGAGEMENT_WEIGHT: u16 = 165;

/// Weight applied to the completion input (Ankh × 100).
pub const COMPLETION_WEIGHT: u16 = 509;

/// Maximum coherence score: `ENGAGEMENT_WEIGHT + COMPLETION_WEIGHT`.
pub const MAX_COHERENCE: u16 = ENGAGEMENT_WEIGHT + COMPLETION_WEIGHT;

/// Scaled binding threshold on the 0..=674 scale (integer part of α⁻¹).
pub const BINDING_NUMERATOR: u16 = 137;

/// Minimum binding coefficient, `137 / 674 ≈ 0.203`.
pub const BINDING_THRESHOLD: f64 = BINDING_NUMERATOR as f64 / MAX_COHERENCE as f64;

/// Highest completion count. Reaching it raises the completion flag.
pub const MAX_COMPLETION_COUNT: u8 = 7;

/// KHAT scaled (√10 × 100).
pub const KHAT_SCALED: u16 = 316;

// ─── 4-bit consent thresholds ───────────────────────────────────────────────

/// Somatic value at or above which consent is full (φ × 16 ≈ 9.89 → 10).
pub const FULL_THRESHOLD_4BIT: u8 = 10;

/// Somatic value at or above which the session is attentive.
pub const ATTENTIVE_THRESHOLD_4BIT: u8 = 7;

/// Somatic value at the diminished boundary ((2 − φ) × 16 ≈ 6.11 → 6).
pub const DIMINISHED_THRESHOLD_4BIT: u8 = 6;

/// Verbal strength that boosts a boundary somatic reading to attentive.
pub const VERBAL_BOOST_MIN: u8 = 2;

// ─── Timing (ticks) ─────────────────────────────────────────────────────────

/// Consecutive below-threshold ticks tolerated before fallback triggers.
pub const KHAT_DURATION: u32 = (KHAT_SCALED % 16) as u32;

/// Consecutive emergency ticks before the lockdown engages.
pub const ETF_DURATION: u32 = (BINDING_NUMERATOR % 16) as u32;

/// Dwell required before upgrading into ATTENTIVE or DIMINISHED_CONSENT.
pub const DWELL_BASE: u32 = 3;

/// Dwell required before upgrading into FULL_CONSENT.
pub const DWELL_FULL: u32 = 19;

/// Ticks between a detected change and its outward reflection.
pub const REFLECTION_DELAY: u32 = 4;

/// RADEL exponential smoothing coefficient, `1 / e`.
pub const RADEL_ALPHA: f32 = 1.0 / core::f32::consts::E;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Digital root: repeated digit sum down to a single digit.
///
/// ```
/// use rpp_core::constants::digital_root;
/// assert_eq!(digital_root(674), 8);
/// assert_eq!(digital_root(0), 0);
/// ```
pub const fn digital_root(n: u32) -> u32 {
    if n == 0 {
        0
    } else {
        1 + (n - 1) % 9
    }
}

/// Quantise a normalised value in [0.0, 1.0] to an unsigned `bits`-wide integer.
///
/// Out-of-range inputs saturate. `bits` is clamped to 1..=8.
pub fn phi_scale(value: f32, bits: u8) -> u8 {
    let bits = bits.clamp(1, 8) as u32;
    let max_val = (1u32 << bits) - 1;
    // NaN compares false against both bounds and lands on 0.
    let scaled = if value > 0.0 { value * (max_val + 1) as f32 } else { 0.0 };
    (scaled as u32).min(max_val) as u8
}

/// Inverse of [`phi_scale`]: map a `bits`-wide integer back into [0.0, 1.0).
pub fn inverse_phi_scale(scaled: u8, bits: u8) -> f32 {
    let bits = bits.clamp(1, 8) as u32;
    scaled as f32 / (1u32 << bits) as f32
}

// ─── Tests ──────────────────────────────────────────────────────────────────
