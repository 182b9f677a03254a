/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Codec and validation errors.
//!
//! Only the header codec and snapshot restore can fail. Scoring, transitions
//! and routing are total functions and have no error type.

use thiserror::Error;

/// Fatal failure to encode or decode a consent header.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderError {
    /// Stored CRC byte disagrees with the CRC recomputed over bytes 0–16.
    #[error("CRC mismatch: computed {computed:#04x}, stored {stored:#04x}")]
    Checksum {
        /// CRC-8 recomputed over the received bytes.
        computed: u8,
        /// CRC-8 carried in byte 17.
        stored: u8,
    },

    /// A field value does not fit its declared bit width.
    #[error("field `{field}` value {value} exceeds its {max} maximum")]
    Range {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u32,
        /// Largest value the field can carry.
        max: u32,
    },

    /// A `Reserved` payload tag holds a nibble that belongs to a named tag.
    #[error("payload type Reserved({nibble:#03x}) aliases a named tag; reserved tags are 0xc-0xf")]
    AliasedPayloadType {
        /// Nibble carried by the reserved tag.
        nibble: u8,
    },

    /// Buffer is not the size the layout requires.
    #[error("expected {expected} bytes, got {actual}")]
    Length {
        /// Required size in bytes.
        expected: usize,
        /// Size supplied.
        actual: usize,
    },

    /// Packet payload is larger than the 16-bit frame allows.
    #[error("payload too large: {len} > {max}")]
    PayloadTooLarge {
        /// Payload length supplied.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },
}

/// One violated semantic rule, reported by `ConsentHeader::validate`.
///
/// Violations are collected, not thrown, so a caller sees every problem with
/// a header in one pass.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// C1: somatic consent below 6 requires a non-zero completion trace.
    #[error("C1: somatic consent {somatic} < 6 requires completion_trace > 0")]
    LowSomaticWithoutTrace {
        /// Somatic value that triggered the rule.
        somatic: u8,
    },

    /// A field holds a value outside its declared bit width.
    #[error("RANGE: `{field}` must be 0-{max}, got {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u32,
        /// Largest legal value.
        max: u32,
    },

    /// A `Reserved` payload tag below 0xC, which would decode as a named tag.
    #[error("RANGE: reserved `payload_type` must be 0xc-0xf, got {nibble:#03x}")]
    AliasedPayloadType {
        /// Nibble carried by the reserved tag.
        nibble: u8,
    },
}

/// Failure to restore state from a snapshot.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// Snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u16,
        /// Version this build reads.
        expected: u16,
    },
}

impl ValidationError {
    /// Short rule tag: `"C1"` or `"RANGE"`.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::LowSomaticWithoutTrace { .. } => "C1",
            ValidationError::OutOfRange { .. } | ValidationError::AliasedPayloadType { .. } => {
                "RANGE"
            }
        }
    }
}
