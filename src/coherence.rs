/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Coherence scoring: two normalised inputs to a bounded integer trust score.
//!
//! ```text
//! score = ⌊165 × engagement⌋ + ⌊509 × completion⌋      ∈ [0, 674]
//! binding coefficient = score / 674
//! completion count    = ⌊binding coefficient × 7⌋      ∈ [0, 7]
//! ```
//!
//! # Invariants
//!
//! - Inputs are clamped to [0.0, 1.0], never rejected. NaN scores as 0.0.
//! - The score is monotonically non-decreasing in both inputs.
//! - [`score`] is pure: no state, no side effects, safe from any thread.

use core::fmt;

use crate::constants::{
    BINDING_NUMERATOR, BINDING_THRESHOLD, COMPLETION_WEIGHT, ENGAGEMENT_WEIGHT,
    MAX_COHERENCE, MAX_COMPLETION_COUNT,
};

// ─── CompletionStage ────────────────────────────────────────────────────────

/// Named stage for each completion count 0..=7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CompletionStage {
    /// No coherence.
    Fragmented = 0,
    /// First partial stage.
    Emerging = 1,
    /// Second partial stage.
    Developing = 2,
    /// Third partial stage.
    Stabilizing = 3,
    /// Fourth partial stage.
    Consolidating = 4,
    /// Fifth partial stage.
    Maturing = 5,
    /// Last partial stage before completion.
    Cohering = 6,
    /// Full completion; raises the completion flag.
    Complete = 7,
}

impl CompletionStage {
    /// Stage for a completion count, clamped to 0..=7.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => CompletionStage::Fragmented,
            1 => CompletionStage::Emerging,
            2 => CompletionStage::Developing,
            3 => CompletionStage::Stabilizing,
            4 => CompletionStage::Consolidating,
            5 => CompletionStage::Maturing,
            6 => CompletionStage::Cohering,
            _ => CompletionStage::Complete,
        }
    }

    /// Upper-case stage name.
    pub fn name(&self) -> &'static str {
        match self {
            CompletionStage::Fragmented => "FRAGMENTED",
            CompletionStage::Emerging => "EMERGING",
            CompletionStage::Developing => "DEVELOPING",
            CompletionStage::Stabilizing => "STABILIZING",
            CompletionStage::Consolidating => "CONSOLIDATING",
            CompletionStage::Maturing => "MATURING",
            CompletionStage::Cohering => "COHERING",
            CompletionStage::Complete => "COMPLETE",
        }
    }
}

// ─── CoherenceResult ────────────────────────────────────────────────────────

/// Immutable result of one scoring evaluation.
///
/// Produced fresh by [`score`]; there are no mutators.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoherenceResult {
    /// Integer score in 0..=[`MAX_COHERENCE`].
    pub score: u16,
    /// `score / MAX_COHERENCE` in [0.0, 1.0].
    pub binding_coefficient: f64,
    /// Completion count in 0..=7.
    pub completion_count: u8,
    /// `binding_coefficient >= BINDING_THRESHOLD`.
    pub binding_valid: bool,
    /// `completion_count == 7`.
    pub completion_flag: bool,
    /// Engagement contribution, `⌊165 × engagement⌋`.
    pub engagement_weight: u16,
    /// Completion contribution, `⌊509 × completion⌋`.
    pub completion_weight: u16,
}

impl CoherenceResult {
    /// Named stage for [`Self::completion_count`].
    pub fn stage(&self) -> CompletionStage {
        CompletionStage::from_count(self.completion_count)
    }

    /// Score as a percentage of [`MAX_COHERENCE`].
    pub fn percentage(&self) -> f64 {
        score_to_percentage(self.score)
    }
}

impl fmt::Display for CoherenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Coherence: {}/{} ({:.1}%)",
            self.score,
            MAX_COHERENCE,
            self.percentage()
        )?;
        if self.completion_flag {
            writeln!(f, "Status: COMPLETE - Full coherence achieved")?;
        } else if self.binding_valid {
            writeln!(f, "Status: BOUND - {} stage", self.stage().name())?;
        } else {
            writeln!(f, "Status: FRAGMENTED - Below binding threshold")?;
        }
        writeln!(f, "Completion: {}/{}", self.completion_count, MAX_COMPLETION_COUNT)?;
        write!(
            f,
            "Binding: {:.3} (threshold: {:.3})",
            self.binding_coefficient, BINDING_THRESHOLD
        )
    }
}

// ─── Scoring ────────────────────────────────────────────────────────────────

fn clamp_unit(x: f64) -> f64 {
    if x > 0.0 {
        x.min(1.0)
    } else {
        0.0
    }
}

/// Weighted contribution `⌊weight × x⌋` of one clamped input.
fn weighted(weight: u16, x: f64) -> u16 {
    // x is in [0, 1], so the product is non-negative and the cast floors.
    (weight as f64 * clamp_unit(x)) as u16
}

/// Score an (engagement, completion) pair.
///
/// Both inputs are clamped to [0.0, 1.0].
///
/// ```
/// use rpp_core::coherence::score;
/// let r = score(1.0, 1.0);
/// assert_eq!(r.score, 674);
/// assert!(r.completion_flag);
/// ```
pub fn score(engagement: f64, completion: f64) -> CoherenceResult {
    let engagement_weight = weighted(ENGAGEMENT_WEIGHT, engagement);
    let completion_weight = weighted(COMPLETION_WEIGHT, completion);
    let score = (engagement_weight + completion_weight).min(MAX_COHERENCE);

    let coefficient = binding_coefficient(score);
    let count = completion_count(score);

    CoherenceResult {
        score,
        binding_coefficient: coefficient,
        completion_count: count,
        binding_valid: is_binding_valid(coefficient),
        completion_flag: count == MAX_COMPLETION_COUNT,
        engagement_weight,
        completion_weight,
    }
}

/// `score / MAX_COHERENCE`, capped at 1.0.
pub fn binding_coefficient(score: u16) -> f64 {
    if score == 0 {
        return 0.0;
    }
    (score as f64 / MAX_COHERENCE as f64).min(1.0)
}

/// `true` when `coefficient` is at or above [`BINDING_THRESHOLD`].
pub fn is_binding_valid(coefficient: f64) -> bool {
    coefficient >= BINDING_THRESHOLD
}

/// Completion count `⌊(score / MAX) × 7⌋`, clamped to 0..=7.
pub fn completion_count(score: u16) -> u8 {
    if score == 0 {
        return 0;
    }
    let count = (score as f64 / MAX_COHERENCE as f64) * MAX_COMPLETION_COUNT as f64;
    (count as u8).min(MAX_COMPLETION_COUNT)
}

/// Score as a percentage of [`MAX_COHERENCE`].
pub fn score_to_percentage(score: u16) -> f64 {
    score as f64 / MAX_COHERENCE as f64 * 100.0
}

/// Inverse of [`score_to_percentage`]; the percentage is clamped to [0, 100].
pub fn percentage_to_score(percentage: f64) -> u16 {
    let p = if percentage > 0.0 { percentage.min(100.0) } else { 0.0 };
    (p / 100.0 * MAX_COHERENCE as f64) as u16
}

/// Lowest score whose binding coefficient is valid (137).
pub fn minimum_binding_score() -> u16 {
    BINDING_NUMERATOR
}

// ─── Tests ──────────────────────────────────────────────────────────────────
