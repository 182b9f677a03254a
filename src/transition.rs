/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Transition dynamics: turning an instantaneous consent reading into a
//! temporally stable, externally observable state.
//!
//! Four gates, all owned by one [`TransitionManager`] per session and ticked
//! together once per discrete step:
//!
//! - [`DwellTimer`]: asymmetric hysteresis. Upgrades wait for a dwell count
//!   that depends on the target; downgrades are immediate.
//! - [`Reflector`]: detected vs reflected state, separated by a fixed delay.
//! - [`FallbackGate`]: sustained low coherence (more than 12 ticks below 137).
//! - [`EmergencyGate`]: sustained emergency condition (9 ticks) forces lockdown.
//!
//! # Tick order
//!
//! ```text
//! fallback.update ─┐
//! emergency.update ┴─► override? ─► reflector.detect ─► dwell.request
//!                                   ─► dwell.tick + reflector.tick ─► reflect
//! ```
//!
//! The order is load-bearing: the emergency override is applied before the
//! reflector or the dwell timer see the raw detected state.
//!
//! # Invariants
//!
//! - Gaining consent is slow, losing it is instant.
//! - Switching upgrade targets mid-dwell discards the prior progress.
//! - A tick at or above the fallback threshold resets the fallback gate fully.
//! - State is per manager. There is no global or shared timer.

use crate::consent::{ConsentState, TransitionDirection};
use crate::constants::{
    BINDING_NUMERATOR, DWELL_BASE, DWELL_FULL, ETF_DURATION, KHAT_DURATION, RADEL_ALPHA,
    REFLECTION_DELAY,
};

// ─── TransitionConfig ───────────────────────────────────────────────────────

/// Timing parameters for the four gates.
///
/// The defaults are the reference values; every deployment exchanging headers
/// with other nodes is expected to keep them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionConfig {
    /// Dwell before an upgrade into FULL_CONSENT. Default 19.
    pub dwell_full: u32,
    /// Dwell before an upgrade into ATTENTIVE or DIMINISHED_CONSENT. Default 3.
    pub dwell_base: u32,
    /// Ticks between detection and reflection. Default 4.
    pub reflection_delay: u32,
    /// Below-threshold ticks tolerated before fallback. Default 12.
    pub khat_duration: u32,
    /// Emergency ticks before lockdown. Default 9.
    pub etf_duration: u32,
    /// Coherence score under which a tick counts toward fallback. Default 137.
    pub fallback_threshold: u16,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            dwell_full: DWELL_FULL,
            dwell_base: DWELL_BASE,
            reflection_delay: REFLECTION_DELAY,
            khat_duration: KHAT_DURATION,
            etf_duration: ETF_DURATION,
            fallback_threshold: BINDING_NUMERATOR,
        }
    }
}

// ─── DwellTimer ─────────────────────────────────────────────────────────────

/// Asymmetric dwell hysteresis over [`ConsentState`].
///
/// - First observation: accepted immediately.
/// - Same state: no-op success, and any pending upgrade is abandoned.
/// - Downgrade (toward a higher ordinal): immediate.
/// - Upgrade: the target must be requested continuously until its dwell
///   count ([`DwellTimer::required_dwell`]) has elapsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DwellTimer {
    pub(crate) dwell_full: u32,
    pub(crate) dwell_base: u32,
    pub(crate) current: Option<ConsentState>,
    pub(crate) cycles_in_state: u32,
    pub(crate) target: Option<ConsentState>,
    pub(crate) cycles_at_target: u32,
}

impl DwellTimer {
    /// Timer with explicit dwell requirements.
    pub fn new(dwell_full: u32, dwell_base: u32) -> Self {
        Self {
            dwell_full,
            dwell_base,
            current: None,
            cycles_in_state: 0,
            target: None,
            cycles_at_target: 0,
        }
    }

    /// Current stable state, `None` before the first request.
    pub fn current_state(&self) -> Option<ConsentState> {
        self.current
    }

    /// Ticks spent in the current state.
    pub fn cycles_in_state(&self) -> u32 {
        self.cycles_in_state
    }

    /// Upgrade target being dwelt on, if any.
    pub fn pending_target(&self) -> Option<ConsentState> {
        self.target
    }

    /// Ticks the pending target has been requested.
    pub fn cycles_at_target(&self) -> u32 {
        self.cycles_at_target
    }

    /// Dwell an upgrade into `target` must wait.
    pub fn required_dwell(&self, target: ConsentState) -> u32 {
        match target {
            ConsentState::FullConsent => self.dwell_full,
            ConsentState::Attentive | ConsentState::DiminishedConsent => self.dwell_base,
            ConsentState::SuspendedConsent | ConsentState::EmergencyOverride => 0,
        }
    }

    /// Force the current state, clearing any pending upgrade.
    pub fn set_state(&mut self, state: ConsentState) {
        if self.current != Some(state) {
            self.activate(state);
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        self.cycles_in_state = self.cycles_in_state.saturating_add(1);
        if self.target.is_some() {
            self.cycles_at_target = self.cycles_at_target.saturating_add(1);
        }
    }

    /// Ask to move to `target`. Returns `true` when `target` is now current.
    pub fn request_transition(&mut self, target: ConsentState) -> bool {
        let Some(current) = self.current else {
            self.activate(target);
            return true;
        };

        match current.direction_to(target) {
            TransitionDirection::None => {
                self.target = None;
                self.cycles_at_target = 0;
                true
            }
            TransitionDirection::Downgrade => {
                self.activate(target);
                true
            }
            TransitionDirection::Upgrade => {
                if self.target != Some(target) {
                    self.target = Some(target);
                    self.cycles_at_target = 0;
                }
                if self.cycles_at_target >= self.required_dwell(target) {
                    self.activate(target);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Whether [`Self::request_transition`] would succeed right now.
    pub fn can_transition_to(&self, target: ConsentState) -> bool {
        let Some(current) = self.current else {
            return true;
        };
        match current.direction_to(target) {
            TransitionDirection::None | TransitionDirection::Downgrade => true,
            TransitionDirection::Upgrade => {
                let progress = if self.target == Some(target) { self.cycles_at_target } else { 0 };
                progress >= self.required_dwell(target)
            }
        }
    }

    fn activate(&mut self, state: ConsentState) {
        match self.current {
            Some(previous) => tracing::debug!(
                from = previous.name(),
                to = state.name(),
                direction = ?previous.direction_to(state),
                "consent state activated"
            ),
            None => tracing::debug!(to = state.name(), "initial consent state"),
        }
        self.current = Some(state);
        self.cycles_in_state = 0;
        self.target = None;
        self.cycles_at_target = 0;
    }
}

impl Default for DwellTimer {
    fn default() -> Self {
        Self::new(DWELL_FULL, DWELL_BASE)
    }
}

// ─── Reflector ──────────────────────────────────────────────────────────────

/// Separates the detected state from the state exposed downstream.
///
/// A change in detection is reflected only after `delay` ticks, so transient
/// flicker never reaches consumers. [`Reflector::force_reflect`] skips the
/// delay and is reserved for the emergency path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reflector {
    pub(crate) delay: u32,
    pub(crate) detected: Option<ConsentState>,
    pub(crate) reflected: Option<ConsentState>,
    pub(crate) cycles_since_detection: u32,
    pub(crate) pending: bool,
}

impl Reflector {
    /// Reflector with the given delay in ticks.
    pub fn new(delay: u32) -> Self {
        Self {
            delay,
            detected: None,
            reflected: None,
            cycles_since_detection: 0,
            pending: false,
        }
    }

    /// Reflection delay in ticks.
    pub fn delay(&self) -> u32 {
        self.delay
    }

    /// Most recently detected state.
    pub fn detected_state(&self) -> Option<ConsentState> {
        self.detected
    }

    /// State currently exposed downstream.
    pub fn reflected_state(&self) -> Option<ConsentState> {
        self.reflected
    }

    /// `true` while a detected change waits to be reflected.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record a detection. A changed state restarts the delay.
    pub fn detect(&mut self, state: ConsentState) -> ConsentState {
        if self.detected != Some(state) {
            self.detected = Some(state);
            self.cycles_since_detection = 0;
            self.pending = true;
        }
        state
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        if self.pending {
            self.cycles_since_detection = self.cycles_since_detection.saturating_add(1);
        }
    }

    /// `true` once a pending change has waited the full delay.
    pub fn should_reflect(&self) -> bool {
        self.pending && self.cycles_since_detection >= self.delay
    }

    /// Expose the detected state if the delay has elapsed.
    ///
    /// Returns the newly exposed state, or `None` when nothing changed
    /// downstream. Detection that flickered away and back settles silently.
    pub fn reflect(&mut self) -> Option<ConsentState> {
        if !self.should_reflect() {
            return None;
        }
        self.pending = false;
        if self.reflected == self.detected {
            return None;
        }
        self.reflected = self.detected;
        self.reflected
    }

    /// Expose the detected state immediately.
    pub fn force_reflect(&mut self) -> Option<ConsentState> {
        self.reflected = self.detected;
        self.pending = false;
        self.cycles_since_detection = 0;
        self.reflected
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new(REFLECTION_DELAY)
    }
}

// ─── FallbackGate ───────────────────────────────────────────────────────────

/// Fires after coherence stays below the threshold for more than
/// `khat_duration` consecutive ticks. No partial decay: one tick at or above
/// the threshold clears the count and the flag together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackGate {
    pub(crate) threshold: u16,
    pub(crate) khat_duration: u32,
    pub(crate) cycles_below: u32,
    pub(crate) triggered: bool,
}

impl FallbackGate {
    /// Gate with an explicit threshold and tolerance.
    pub fn new(threshold: u16, khat_duration: u32) -> Self {
        Self {
            threshold,
            khat_duration,
            cycles_below: 0,
            triggered: false,
        }
    }

    /// Coherence threshold.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Consecutive below-threshold ticks.
    pub fn cycles_below(&self) -> u32 {
        self.cycles_below
    }

    /// Whether fallback is currently triggered.
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Feed one tick's coherence score. Returns the triggered flag.
    pub fn update(&mut self, coherence: u16) -> bool {
        if coherence < self.threshold {
            self.cycles_below = self.cycles_below.saturating_add(1);
            if self.cycles_below > self.khat_duration && !self.triggered {
                self.triggered = true;
                tracing::warn!(
                    cycles_below = self.cycles_below,
                    threshold = self.threshold,
                    "fallback gate triggered"
                );
            }
        } else {
            if self.triggered {
                tracing::info!(coherence, "fallback gate cleared");
            }
            self.reset();
        }
        self.triggered
    }

    /// Clear the count and the flag.
    pub fn reset(&mut self) {
        self.cycles_below = 0;
        self.triggered = false;
    }
}

impl Default for FallbackGate {
    fn default() -> Self {
        Self::new(BINDING_NUMERATOR, KHAT_DURATION)
    }
}

// ─── EmergencyGate ──────────────────────────────────────────────────────────

/// Engages lockdown once an emergency condition has held for `etf_duration`
/// consecutive ticks. Clears the first tick the condition is absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmergencyGate {
    pub(crate) etf_duration: u32,
    pub(crate) emergency_cycles: u32,
    pub(crate) active: bool,
}

impl EmergencyGate {
    /// Gate engaging after `etf_duration` emergency ticks.
    pub fn new(etf_duration: u32) -> Self {
        Self {
            etf_duration,
            emergency_cycles: 0,
            active: false,
        }
    }

    /// Whether lockdown is engaged.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Consecutive emergency ticks.
    pub fn emergency_cycles(&self) -> u32 {
        self.emergency_cycles
    }

    /// Feed one tick's emergency condition. Returns the active flag.
    pub fn update(&mut self, is_emergency: bool) -> bool {
        if is_emergency {
            self.emergency_cycles = self.emergency_cycles.saturating_add(1);
            if self.emergency_cycles >= self.etf_duration && !self.active {
                self.active = true;
                tracing::warn!(cycles = self.emergency_cycles, "emergency lockdown engaged");
            }
        } else {
            if self.active {
                tracing::info!("emergency lockdown cleared");
            }
            self.emergency_cycles = 0;
            self.active = false;
        }
        self.active
    }

    /// Engage lockdown without waiting.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Release lockdown and clear the count.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.emergency_cycles = 0;
    }
}

impl Default for EmergencyGate {
    fn default() -> Self {
        Self::new(ETF_DURATION)
    }
}

// ─── TransitionManager ──────────────────────────────────────────────────────

/// Everything a caller needs to know about one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickResult {
    /// Tick number, starting at 1.
    pub cycle: u64,
    /// Detected state after the emergency override.
    pub detected_state: ConsentState,
    /// Dwell-gated stable state.
    pub current_state: ConsentState,
    /// State exposed downstream, `None` until the first reflection.
    pub reflected_state: Option<ConsentState>,
    /// A reflection happened on this tick.
    pub newly_reflected: bool,
    /// The requested transition is in effect after this tick.
    pub transition_granted: bool,
    /// Fallback gate flag.
    pub fallback_triggered: bool,
    /// Emergency lockdown flag.
    pub emergency_active: bool,
    /// Ticks spent in `current_state`.
    pub dwell_cycles: u32,
}

/// Owns and sequences the four gates for one session.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionManager {
    pub(crate) config: TransitionConfig,
    pub(crate) dwell: DwellTimer,
    pub(crate) reflector: Reflector,
    pub(crate) fallback: FallbackGate,
    pub(crate) emergency: EmergencyGate,
    pub(crate) smoothed_somatic: f32,
    pub(crate) cycle: u64,
}

impl TransitionManager {
    /// Manager with gates sized from `config`.
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            dwell: DwellTimer::new(config.dwell_full, config.dwell_base),
            reflector: Reflector::new(config.reflection_delay),
            fallback: FallbackGate::new(config.fallback_threshold, config.khat_duration),
            emergency: EmergencyGate::new(config.etf_duration),
            smoothed_somatic: 0.0,
            cycle: 0,
            config,
        }
    }

    /// Run one tick.
    pub fn tick(&mut self, detected: ConsentState, coherence: u16, is_emergency: bool) -> TickResult {
        self.cycle = self.cycle.saturating_add(1);

        let fallback_triggered = self.fallback.update(coherence);
        let emergency_active = self.emergency.update(is_emergency);

        let detected = if emergency_active {
            ConsentState::EmergencyOverride
        } else {
            detected
        };

        self.reflector.detect(detected);
        let transition_granted = self.dwell.request_transition(detected);

        self.dwell.tick();
        self.reflector.tick();

        let newly_reflected = if emergency_active {
            let before = self.reflector.reflected_state();
            before != self.reflector.force_reflect()
        } else {
            self.reflector.reflect().is_some()
        };

        TickResult {
            cycle: self.cycle,
            detected_state: detected,
            current_state: self.dwell.current_state().unwrap_or(detected),
            reflected_state: self.reflector.reflected_state(),
            newly_reflected,
            transition_granted,
            fallback_triggered,
            emergency_active,
            dwell_cycles: self.dwell.cycles_in_state(),
        }
    }

    /// RADEL exponential smoothing of a raw 4-bit somatic reading.
    ///
    /// `s ← α·(raw/15) + (1 − α)·s` with α = 1/e; returns `⌊s·15⌋`.
    /// Inputs above 15 are treated as 15.
    pub fn smooth_somatic(&mut self, raw: u8) -> u8 {
        let normalized = raw.min(15) as f32 / 15.0;
        self.smoothed_somatic =
            RADEL_ALPHA * normalized + (1.0 - RADEL_ALPHA) * self.smoothed_somatic;
        (self.smoothed_somatic * 15.0) as u8
    }

    /// Drop all gate state and restart the cycle count. Config is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Dwell-gated stable state, `None` before the first tick.
    pub fn current_state(&self) -> Option<ConsentState> {
        self.dwell.current_state()
    }

    /// State that gates routing.
    ///
    /// The dwell-gated current state, SUSPENDED_CONSENT before the first
    /// tick, and never more permissive than SUSPENDED_CONSENT while the
    /// fallback gate is triggered.
    pub fn routing_state(&self) -> ConsentState {
        match self.dwell.current_state() {
            None => ConsentState::SuspendedConsent,
            Some(state) if self.fallback.is_triggered() => {
                state.max(ConsentState::SuspendedConsent)
            }
            Some(state) => state,
        }
    }

    /// Last detected state.
    pub fn detected_state(&self) -> Option<ConsentState> {
        self.reflector.detected_state()
    }

    /// State exposed downstream.
    pub fn reflected_state(&self) -> Option<ConsentState> {
        self.reflector.reflected_state()
    }

    /// Ticks run since creation or the last reset.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Whether the fallback gate is triggered.
    pub fn is_fallback_triggered(&self) -> bool {
        self.fallback.is_triggered()
    }

    /// Whether emergency lockdown is engaged.
    pub fn is_emergency_active(&self) -> bool {
        self.emergency.is_active()
    }

    /// Current smoothed somatic level in [0.0, 1.0].
    pub fn smoothed_somatic(&self) -> f32 {
        self.smoothed_somatic
    }

    /// Active configuration.
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Dwell timer.
    pub fn dwell_timer(&self) -> &DwellTimer {
        &self.dwell
    }

    /// Reflector.
    pub fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    /// Fallback gate.
    pub fn fallback_gate(&self) -> &FallbackGate {
        &self.fallback
    }

    /// Emergency gate.
    pub fn emergency_gate(&self) -> &EmergencyGate {
        &self.emergency
    }
}

impl Default for TransitionManager {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ConsentState::*;

    // ── DwellTimer ────────────────────────────────────────────────────────

    #[test]
    fn test_dwell_first_request_immediate() {
        let mut t = DwellTimer::default();
        assert_eq!(t.current_state(), None);
        assert!(t.request_transition(FullConsent));
        assert_eq!(t.current_state(), Some(FullConsent));
    }

    #[test]
    fn test_dwell_downgrade_immediate() {
        let mut t = DwellTimer::default();
        t.request_transition(FullConsent);
        assert!(t.request_transition(Attentive));
        assert_eq!(t.current_state(), Some(Attentive));
        assert!(t.request_transition(EmergencyOverride));
        assert_eq!(t.current_state(), Some(EmergencyOverride));
    }

    #[test]
    fn test_dwell_full_fails_1_to_18_succeeds_19() {
        let mut t = DwellTimer::default();
        t.request_transition(Attentive);
        assert!(!t.request_transition(FullConsent));
        for elapsed in 1..=18 {
            t.tick();
            assert!(!t.request_transition(FullConsent), "granted after {} ticks", elapsed);
        }
        t.tick();
        assert!(t.request_transition(FullConsent));
        assert_eq!(t.current_state(), Some(FullConsent));
    }

    #[test]
    fn test_dwell_attentive_needs_three() {
        let mut t = DwellTimer::default();
        t.request_transition(SuspendedConsent);
        assert!(!t.request_transition(Attentive));
        t.tick();
        assert!(!t.request_transition(Attentive));
        t.tick();
        assert!(!t.request_transition(Attentive));
        t.tick();
        assert!(t.request_transition(Attentive));
    }

    #[test]
    fn test_dwell_zero_upgrade_same_tick() {
        let mut t = DwellTimer::default();
        t.request_transition(EmergencyOverride);
        assert!(t.request_transition(SuspendedConsent));
        assert_eq!(t.current_state(), Some(SuspendedConsent));
    }

    #[test]
    fn test_dwell_switching_target_discards_progress() {
        let mut t = DwellTimer::default();
        t.request_transition(SuspendedConsent);
        t.request_transition(Attentive);
        t.tick();
        t.tick();
        assert!(!t.request_transition(DiminishedConsent));
        assert_eq!(t.cycles_at_target(), 0);
        assert_eq!(t.pending_target(), Some(DiminishedConsent));
    }

    #[test]
    fn test_dwell_same_state_abandons_pending_upgrade() {
        let mut t = DwellTimer::default();
        t.request_transition(Attentive);
        t.request_transition(FullConsent);
        for _ in 0..30 {
            t.tick();
        }
        assert!(t.request_transition(Attentive));
        assert_eq!(t.pending_target(), None);
        assert!(!t.request_transition(FullConsent));
    }

    #[test]
    fn test_dwell_can_transition_to() {
        let mut t = DwellTimer::default();
        assert!(t.can_transition_to(FullConsent));
        t.request_transition(Attentive);
        assert!(!t.can_transition_to(FullConsent));
        assert!(t.can_transition_to(SuspendedConsent));
        assert!(t.can_transition_to(Attentive));
    }

    #[test]
    fn test_required_dwell_per_target() {
        let t = DwellTimer::default();
        assert_eq!(t.required_dwell(FullConsent), 19);
        assert_eq!(t.required_dwell(Attentive), 3);
        assert_eq!(t.required_dwell(DiminishedConsent), 3);
        assert_eq!(t.required_dwell(SuspendedConsent), 0);
        assert_eq!(t.required_dwell(EmergencyOverride), 0);
    }

    // ── Reflector ─────────────────────────────────────────────────────────

    #[test]
    fn test_reflector_waits_for_delay() {
        let mut r = Reflector::default();
        assert_eq!(r.delay(), 4);
        r.detect(FullConsent);
        for _ in 0..3 {
            r.tick();
            assert!(!r.should_reflect());
            assert_eq!(r.reflect(), None);
        }
        r.tick();
        assert!(r.should_reflect());
        assert_eq!(r.reflect(), Some(FullConsent));
        assert_eq!(r.reflected_state(), Some(FullConsent));
        assert!(!r.is_pending());
    }

    #[test]
    fn test_reflector_new_detection_restarts_delay() {
        let mut r = Reflector::default();
        r.detect(FullConsent);
        r.tick();
        r.tick();
        r.detect(Attentive);
        r.tick();
        r.tick();
        assert!(!r.should_reflect());
    }

    #[test]
    fn test_reflector_same_detection_does_not_restart() {
        let mut r = Reflector::default();
        r.detect(FullConsent);
        r.tick();
        r.tick();
        r.detect(FullConsent);
        r.tick();
        r.tick();
        assert!(r.should_reflect());
    }

    #[test]
    fn test_reflector_flicker_back_is_not_a_reflection() {
        let mut r = Reflector::default();
        r.detect(Attentive);
        for _ in 0..4 {
            r.tick();
        }
        assert_eq!(r.reflect(), Some(Attentive));

        r.detect(SuspendedConsent);
        r.tick();
        r.detect(Attentive);
        assert!(r.is_pending());
        for _ in 0..4 {
            r.tick();
        }
        assert!(r.should_reflect());
        assert_eq!(r.reflect(), None);
        assert!(!r.is_pending());
        assert_eq!(r.reflected_state(), Some(Attentive));
    }

    #[test]
    fn test_force_reflect_bypasses_delay() {
        let mut r = Reflector::default();
        r.detect(Attentive);
        assert_eq!(r.force_reflect(), Some(Attentive));
        assert!(!r.is_pending());
    }

    // ── FallbackGate ──────────────────────────────────────────────────────

    #[test]
    fn test_fallback_twelve_below_do_not_trigger() {
        let mut g = FallbackGate::default();
        for _ in 0..12 {
            assert!(!g.update(100));
        }
        assert_eq!(g.cycles_below(), 12);
        assert!(g.update(100));
        assert!(g.is_triggered());
    }

    #[test]
    fn test_fallback_one_good_tick_resets() {
        let mut g = FallbackGate::default();
        for _ in 0..20 {
            g.update(0);
        }
        assert!(g.is_triggered());
        assert!(!g.update(137));
        assert_eq!(g.cycles_below(), 0);
        assert!(!g.is_triggered());
    }

    #[test]
    fn test_fallback_above_threshold_never_counts() {
        let mut g = FallbackGate::default();
        for _ in 0..50 {
            assert!(!g.update(674));
        }
        assert_eq!(g.cycles_below(), 0);
    }

    // ── EmergencyGate ─────────────────────────────────────────────────────

    #[test]
    fn test_emergency_activates_at_nine() {
        let mut g = EmergencyGate::default();
        for _ in 0..8 {
            assert!(!g.update(true));
        }
        assert!(g.update(true));
        assert_eq!(g.emergency_cycles(), 9);
    }

    #[test]
    fn test_emergency_clears_on_first_absent_tick() {
        let mut g = EmergencyGate::default();
        for _ in 0..10 {
            g.update(true);
        }
        assert!(!g.update(false));
        assert_eq!(g.emergency_cycles(), 0);
    }

    #[test]
    fn test_emergency_manual_activation() {
        let mut g = EmergencyGate::default();
        g.activate();
        assert!(g.is_active());
        g.deactivate();
        assert!(!g.is_active());
    }

    // ── TransitionManager ─────────────────────────────────────────────────

    #[test]
    fn test_manager_initial_state() {
        let m = TransitionManager::default();
        assert_eq!(m.current_state(), None);
        assert_eq!(m.cycle(), 0);
    }

    #[test]
    fn test_manager_first_tick() {
        let mut m = TransitionManager::default();
        let r = m.tick(Attentive, 400, false);
        assert_eq!(r.cycle, 1);
        assert_eq!(r.detected_state, Attentive);
        assert_eq!(r.current_state, Attentive);
        assert!(r.transition_granted);
        assert_eq!(r.reflected_state, None);
        assert!(!r.newly_reflected);
        assert_eq!(r.dwell_cycles, 1);
    }

    #[test]
    fn test_manager_reflects_on_fourth_tick() {
        let mut m = TransitionManager::default();
        for _ in 0..3 {
            assert!(!m.tick(FullConsent, 600, false).newly_reflected);
        }
        let r = m.tick(FullConsent, 600, false);
        assert!(r.newly_reflected);
        assert_eq!(r.reflected_state, Some(FullConsent));
    }

    #[test]
    fn test_manager_flicker_back_reports_no_reflection() {
        let mut m = TransitionManager::default();
        for _ in 0..4 {
            m.tick(Attentive, 600, false);
        }
        assert_eq!(m.reflected_state(), Some(Attentive));

        assert!(!m.tick(SuspendedConsent, 600, false).newly_reflected);
        for _ in 0..6 {
            let r = m.tick(Attentive, 600, false);
            assert!(!r.newly_reflected);
            assert_eq!(r.reflected_state, Some(Attentive));
        }
    }

    #[test]
    fn test_manager_cycle_saturates() {
        let mut m = TransitionManager::default();
        m.cycle = u64::MAX;
        assert_eq!(m.tick(Attentive, 600, false).cycle, u64::MAX);
        assert_eq!(m.cycle(), u64::MAX);
    }

    #[test]
    fn test_manager_full_upgrade_on_twentieth_request() {
        let mut m = TransitionManager::default();
        m.tick(Attentive, 400, false);
        for n in 1..=19 {
            let r = m.tick(FullConsent, 600, false);
            assert!(!r.transition_granted, "granted on request {}", n);
            assert_eq!(r.current_state, Attentive);
        }
        let r = m.tick(FullConsent, 600, false);
        assert!(r.transition_granted);
        assert_eq!(r.current_state, FullConsent);
    }

    #[test]
    fn test_manager_emergency_overrides_detection() {
        let mut m = TransitionManager::default();
        m.tick(FullConsent, 600, false);
        for _ in 0..8 {
            let r = m.tick(FullConsent, 600, true);
            assert!(!r.emergency_active);
            assert_eq!(r.current_state, FullConsent);
        }
        let r = m.tick(FullConsent, 600, true);
        assert!(r.emergency_active);
        assert_eq!(r.detected_state, EmergencyOverride);
        assert_eq!(r.current_state, EmergencyOverride);
        assert_eq!(r.reflected_state, Some(EmergencyOverride));
        assert!(r.newly_reflected);

        let held = m.tick(FullConsent, 600, true);
        assert!(!held.newly_reflected);
        assert_eq!(held.reflected_state, Some(EmergencyOverride));
    }

    #[test]
    fn test_manager_emergency_wins_over_fallback_same_tick() {
        let mut m = TransitionManager::default();
        m.tick(FullConsent, 600, false);
        let mut last = None;
        for _ in 0..13 {
            last = Some(m.tick(FullConsent, 0, true));
        }
        let r = last.unwrap();
        assert!(r.fallback_triggered);
        assert!(r.emergency_active);
        assert_eq!(r.current_state, EmergencyOverride);
    }

    #[test]
    fn test_manager_fallback_flag() {
        let mut m = TransitionManager::default();
        for _ in 0..12 {
            assert!(!m.tick(Attentive, 50, false).fallback_triggered);
        }
        assert!(m.tick(Attentive, 50, false).fallback_triggered);
        assert!(m.is_fallback_triggered());
        assert!(!m.tick(Attentive, 200, false).fallback_triggered);
    }

    #[test]
    fn test_routing_state_capped_by_fallback() {
        let mut m = TransitionManager::default();
        assert_eq!(m.routing_state(), SuspendedConsent);
        m.tick(FullConsent, 600, false);
        assert_eq!(m.routing_state(), FullConsent);
        for _ in 0..13 {
            m.tick(FullConsent, 10, false);
        }
        assert_eq!(m.routing_state(), SuspendedConsent);
        m.tick(FullConsent, 10, true);
        assert_eq!(m.routing_state(), SuspendedConsent);
    }

    #[test]
    fn test_smooth_somatic_converges() {
        let mut m = TransitionManager::default();
        let first = m.smooth_somatic(15);
        assert_eq!(first, 5);
        let second = m.smooth_somatic(15);
        assert!(second > first && second < 15);
        for _ in 0..50 {
            m.smooth_somatic(15);
        }
        assert!(m.smooth_somatic(15) >= 14);
    }

    #[test]
    fn test_smooth_somatic_clamps_input() {
        let mut a = TransitionManager::default();
        let mut b = TransitionManager::default();
        assert_eq!(a.smooth_somatic(200), b.smooth_somatic(15));
    }

    #[test]
    fn test_reset_keeps_config() {
        let config = TransitionConfig { dwell_full: 5, ..TransitionConfig::default() };
        let mut m = TransitionManager::new(config.clone());
        m.tick(Attentive, 300, false);
        m.tick(Attentive, 300, false);
        m.smooth_somatic(10);
        assert_eq!(m.cycle(), 2);
        m.reset();
        assert_eq!(m.cycle(), 0);
        assert_eq!(m.current_state(), None);
        assert_eq!(m.smoothed_somatic(), 0.0);
        assert_eq!(m.config(), &config);
    }

    #[test]
    fn test_custom_config_shortens_dwell() {
        let config = TransitionConfig { dwell_full: 2, ..TransitionConfig::default() };
        let mut m = TransitionManager::new(config);
        m.tick(Attentive, 400, false);
        assert!(!m.tick(FullConsent, 600, false).transition_granted);
        assert!(!m.tick(FullConsent, 600, false).transition_granted);
        assert!(m.tick(FullConsent, 600, false).transition_granted);
    }
}
