/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Python FFI bindings via PyO3.
//!
//! Exposes the codec, scorer, classifier, transition manager and router.
//! Sectors cross the boundary as their 0–8 discriminants.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from rpp_core import ConsentHeader, ConsentState, TransitionManager
//! from rpp_core import decode_header, encode_header, score, route_to_sector
//!
//! raw = encode_header(ConsentHeader(address=0x1234, somatic=12, verbal=2))
//! header = decode_header(raw)
//! manager = TransitionManager()
//! tick = manager.tick(header.consent_state(), score(0.8, 0.9).score, False)
//! decision = route_to_sector(tick.current_state, 3, 590, True)
//! print(decision.granted, decision.sector, decision.reason)
//! ```

#![allow(non_snake_case)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::coherence::{self, CoherenceResult};
use crate::consent::{self, ConsentState};
use crate::header::{ConsentHeader, PayloadType};
use crate::sector::{self, RoutableSector, RoutingDecision};
use crate::transition::{TickResult, TransitionManager as RustTransitionManager};

fn sector_from_index(index: u8) -> PyResult<RoutableSector> {
    RoutableSector::from_u8(index).ok_or_else(|| {
        PyValueError::new_err(format!("sector must be 0-8, got {index}"))
    })
}

// ── ConsentState ──────────────────────────────────────────────────────────────

/// One of five ordered consent states, most permissive first.
#[pyclass(name = "ConsentState")]
#[derive(Clone)]
pub struct PyConsentState {
    inner: ConsentState,
}

#[pymethods]
impl PyConsentState {
    /// FULL_CONSENT class attribute.
    #[classattr]
    pub fn FULL_CONSENT() -> Self {
        Self { inner: ConsentState::FullConsent }
    }

    /// ATTENTIVE class attribute.
    #[classattr]
    pub fn ATTENTIVE() -> Self {
        Self { inner: ConsentState::Attentive }
    }

    /// DIMINISHED_CONSENT class attribute.
    #[classattr]
    pub fn DIMINISHED_CONSENT() -> Self {
        Self { inner: ConsentState::DiminishedConsent }
    }

    /// SUSPENDED_CONSENT class attribute.
    #[classattr]
    pub fn SUSPENDED_CONSENT() -> Self {
        Self { inner: ConsentState::SuspendedConsent }
    }

    /// EMERGENCY_OVERRIDE class attribute.
    #[classattr]
    pub fn EMERGENCY_OVERRIDE() -> Self {
        Self { inner: ConsentState::EmergencyOverride }
    }

    /// Ordinal, 0 (most permissive) to 4.
    #[getter]
    pub fn value(&self) -> u8 {
        self.inner.ordinal()
    }

    /// Canonical name.
    #[getter]
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("ConsentState.{}", self.inner.name())
    }

    /// Python equality comparison.
    pub fn __eq__(&self, other: &PyConsentState) -> bool {
        self.inner == other.inner
    }
}

fn state_to_py(inner: ConsentState) -> PyConsentState {
    PyConsentState { inner }
}

// ── CoherenceResult ───────────────────────────────────────────────────────────

/// Result of one coherence evaluation.
#[pyclass(name = "CoherenceResult")]
#[derive(Clone)]
pub struct PyCoherenceResult {
    inner: CoherenceResult,
}

#[pymethods]
impl PyCoherenceResult {
    /// Integer score, 0–674.
    #[getter]
    pub fn score(&self) -> u16 {
        self.inner.score
    }

    /// `score / 674`.
    #[getter]
    pub fn binding_coefficient(&self) -> f64 {
        self.inner.binding_coefficient
    }

    /// Completion count, 0–7.
    #[getter]
    pub fn completion_count(&self) -> u8 {
        self.inner.completion_count
    }

    /// Whether the binding coefficient reaches 137/674.
    #[getter]
    pub fn binding_valid(&self) -> bool {
        self.inner.binding_valid
    }

    /// Whether the completion count is 7.
    #[getter]
    pub fn completion_flag(&self) -> bool {
        self.inner.completion_flag
    }

    /// Python str: the status block.
    pub fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

// ── ConsentHeader ─────────────────────────────────────────────────────────────

/// Decoded 18-byte consent header.
#[pyclass(name = "ConsentHeader")]
#[derive(Clone)]
pub struct PyConsentHeader {
    inner: ConsentHeader,
}

#[pymethods]
impl PyConsentHeader {
    /// Build a header. Field widths are checked when encoding.
    #[new]
    #[pyo3(signature = (
        address=0, somatic=15, verbal=3, completion_trace=0, phase_entropy=0,
        origin_ref=0, packet_id=0, window_id=0, payload_type=0
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: u32,
        somatic: u8,
        verbal: u8,
        completion_trace: u8,
        phase_entropy: u8,
        origin_ref: u16,
        packet_id: u32,
        window_id: u16,
        payload_type: u8,
    ) -> Self {
        Self {
            inner: ConsentHeader::new(address)
                .with_consent(somatic, verbal)
                .with_entropy(phase_entropy, completion_trace)
                .with_identity(packet_id, origin_ref)
                .with_window(window_id)
                .with_payload_type(PayloadType::from_nibble(payload_type)),
        }
    }

    /// Routing address.
    #[getter]
    pub fn address(&self) -> u32 {
        self.inner.address
    }

    /// Somatic consent, 0–15.
    #[getter]
    pub fn somatic(&self) -> u8 {
        self.inner.somatic
    }

    /// Verbal signal, 0–3.
    #[getter]
    pub fn verbal(&self) -> u8 {
        self.inner.verbal
    }

    /// Completion trace, 0–7.
    #[getter]
    pub fn completion_trace(&self) -> u8 {
        self.inner.completion_trace
    }

    /// Phase entropy, 0–31.
    #[getter]
    pub fn phase_entropy(&self) -> u8 {
        self.inner.phase_entropy
    }

    /// Origin reference.
    #[getter]
    pub fn origin_ref(&self) -> u16 {
        self.inner.origin_ref
    }

    /// Payload type nibble.
    #[getter]
    pub fn payload_type(&self) -> u8 {
        self.inner.payload_type.to_nibble()
    }

    /// Consent state derived from somatic and verbal.
    pub fn consent_state(&self) -> PyConsentState {
        state_to_py(self.inner.consent_state())
    }

    /// Whether phase entropy asks for fallback routing.
    pub fn needs_fallback(&self) -> bool {
        self.inner.needs_fallback()
    }

    /// All rule violations, as messages. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        self.inner.validate().iter().map(|v| v.to_string()).collect()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "ConsentHeader(address={:#010x}, somatic={}, verbal={}, state={})",
            self.inner.address,
            self.inner.somatic,
            self.inner.verbal,
            self.inner.consent_state(),
        )
    }

    /// Python equality comparison.
    pub fn __eq__(&self, other: &PyConsentHeader) -> bool {
        self.inner == other.inner
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

/// Outcome of a routing request.
#[pyclass(name = "RoutingDecision")]
#[derive(Clone)]
pub struct PyRoutingDecision {
    inner: RoutingDecision,
}

#[pymethods]
impl PyRoutingDecision {
    /// Whether the packet may proceed.
    #[getter]
    pub fn granted(&self) -> bool {
        self.inner.granted
    }

    /// Resolved sector index.
    #[getter]
    pub fn sector(&self) -> u8 {
        self.inner.sector as u8
    }

    /// Requested sector index.
    #[getter]
    pub fn original_sector(&self) -> u8 {
        self.inner.original_sector as u8
    }

    /// Whether the request was redirected.
    #[getter]
    pub fn redirected(&self) -> bool {
        self.inner.redirected()
    }

    /// Human-readable reason.
    #[getter]
    pub fn reason(&self) -> String {
        self.inner.reason.to_string()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("RoutingDecision({})", self.inner)
    }
}

// ── TransitionManager ─────────────────────────────────────────────────────────

/// Result of one transition tick.
#[pyclass(name = "TickResult")]
#[derive(Clone)]
pub struct PyTickResult {
    inner: TickResult,
}

#[pymethods]
impl PyTickResult {
    /// Tick number.
    #[getter]
    pub fn cycle(&self) -> u64 {
        self.inner.cycle
    }

    /// Detected state after the emergency override.
    #[getter]
    pub fn detected_state(&self) -> PyConsentState {
        state_to_py(self.inner.detected_state)
    }

    /// Dwell-gated stable state.
    #[getter]
    pub fn current_state(&self) -> PyConsentState {
        state_to_py(self.inner.current_state)
    }

    /// Reflected state, or None before the first reflection.
    #[getter]
    pub fn reflected_state(&self) -> Option<PyConsentState> {
        self.inner.reflected_state.map(state_to_py)
    }

    /// Whether the requested transition is in effect.
    #[getter]
    pub fn transition_granted(&self) -> bool {
        self.inner.transition_granted
    }

    /// Fallback gate flag.
    #[getter]
    pub fn fallback_triggered(&self) -> bool {
        self.inner.fallback_triggered
    }

    /// Emergency lockdown flag.
    #[getter]
    pub fn emergency_active(&self) -> bool {
        self.inner.emergency_active
    }
}

/// Per-session transition dynamics.
#[pyclass(name = "TransitionManager")]
pub struct PyTransitionManager {
    inner: RustTransitionManager,
}

#[pymethods]
impl PyTransitionManager {
    /// Create a manager with the reference timing.
    #[new]
    pub fn new() -> Self {
        Self { inner: RustTransitionManager::default() }
    }

    /// Run one tick.
    #[pyo3(signature = (detected, coherence, is_emergency=false))]
    pub fn tick(&mut self, detected: &PyConsentState, coherence: u16, is_emergency: bool) -> PyTickResult {
        PyTickResult {
            inner: self.inner.tick(detected.inner, coherence, is_emergency),
        }
    }

    /// RADEL-smooth a raw somatic reading.
    pub fn smooth_somatic(&mut self, raw: u8) -> u8 {
        self.inner.smooth_somatic(raw)
    }

    /// State that gates routing.
    pub fn routing_state(&self) -> PyConsentState {
        state_to_py(self.inner.routing_state())
    }

    /// Tick count.
    #[getter]
    pub fn cycle(&self) -> u64 {
        self.inner.cycle()
    }

    /// Drop all gate state.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Classify raw somatic (0–15) and verbal (0–3) signals.
#[pyfunction]
pub fn derive_consent_state(somatic: u8, verbal: u8) -> PyConsentState {
    state_to_py(consent::derive_consent_state(somatic, verbal))
}

/// Score engagement and completion, each in [0.0, 1.0].
#[pyfunction]
pub fn score(engagement: f64, completion: f64) -> PyCoherenceResult {
    PyCoherenceResult { inner: coherence::score(engagement, completion) }
}

/// Decode 18 bytes. Raises ValueError on a length or CRC error.
#[pyfunction]
pub fn decode_header(data: &[u8]) -> PyResult<PyConsentHeader> {
    ConsentHeader::from_slice(data)
        .map(|inner| PyConsentHeader { inner })
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Encode a header to 18 bytes. Raises ValueError on an over-width field.
#[pyfunction]
pub fn encode_header<'py>(py: Python<'py>, header: &PyConsentHeader) -> PyResult<Bound<'py, PyBytes>> {
    let bytes = header
        .inner
        .encode()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(PyBytes::new_bound(py, &bytes))
}

/// Route a request for sector index 0–8.
#[pyfunction]
#[pyo3(signature = (state, requested, coherence=674, allow_fallback=true))]
pub fn route_to_sector(
    state: &PyConsentState,
    requested: u8,
    coherence: u16,
    allow_fallback: bool,
) -> PyResult<PyRoutingDecision> {
    let requested = sector_from_index(requested)?;
    Ok(PyRoutingDecision {
        inner: sector::route_to_sector(state.inner, requested, coherence, allow_fallback),
    })
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Consent-gated routing core: header codec, coherence scoring, transition
/// dynamics and sector routing.
#[pymodule]
pub fn rpp_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyConsentState>()?;
    m.add_class::<PyCoherenceResult>()?;
    m.add_class::<PyConsentHeader>()?;
    m.add_class::<PyRoutingDecision>()?;
    m.add_class::<PyTickResult>()?;
    m.add_class::<PyTransitionManager>()?;
    m.add_function(wrap_pyfunction!(derive_consent_state, m)?)?;
    m.add_function(wrap_pyfunction!(score, m)?)?;
    m.add_function(wrap_pyfunction!(decode_header, m)?)?;
    m.add_function(wrap_pyfunction!(encode_header, m)?)?;
    m.add_function(wrap_pyfunction!(route_to_sector, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("HEADER_SIZE", crate::header::HEADER_SIZE)?;
    Ok(())
}
