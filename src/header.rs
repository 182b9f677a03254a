/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Consent header codec: the fixed 18-byte (144-bit) v2.0 wire layout.
//!
//! # Binary layout (big-endian, bit 0 = MSB of byte 0)
//!
//! ```text
//! [0..4]   opaque routing address            32 bits
//! [4..8]   packet identifier                 32 bits
//! [8..10]  origin reference                  16 bits
//! [10]     verbal(2) | somatic(4) | ancestral(2)
//! [11]     phase entropy(5) | completion trace(3)
//! [12]     lock(1) | reserved(3) | payload type(4)
//! [13]     fallback vector                    8 bits
//! [14..16] coherence window reference        16 bits
//! [16]     target phase reference             8 bits
//! [17]     CRC-8 (poly 0x07) over bytes 0–16
//! ```
//!
//! Every field's offset and width is declared once in [`layout`]; encode and
//! decode both go through the same width-checked [`BitField`] accessors.
//!
//! # Invariants
//!
//! - Encoded headers are always exactly [`HEADER_SIZE`] bytes.
//! - [`decode`] verifies the CRC before extracting any field.
//! - [`encode`] never truncates: an over-width field is a [`HeaderError::Range`].
//! - Semantic validation ([`ConsentHeader::validate`]) is a separate, explicit step.
//!
//! The layout is versionless. Changing any width is a breaking wire change.

use heapless::Vec as HVec;

use crate::consent::{derive_consent_state, ConsentState};
use crate::constants::DIMINISHED_THRESHOLD_4BIT;
use crate::error::{HeaderError, ValidationError};

/// Encoded header size in bytes.
pub const HEADER_SIZE: usize = 18;

/// Encoded header size in bits.
pub const HEADER_BITS: usize = HEADER_SIZE * 8;

/// CRC-8/CCITT generator polynomial (x⁸ + x² + x + 1).
pub const CRC8_POLY: u8 = 0x07;

/// Phase entropy above which the sender asks for fallback routing.
pub const ENTROPY_FALLBACK_THRESHOLD: u8 = 25;

/// Maximum number of violations [`ConsentHeader::validate`] can report.
pub const MAX_VIOLATIONS: usize = 8;

/// Violations found by [`ConsentHeader::validate`]. Empty means valid.
pub type Violations = HVec<ValidationError, MAX_VIOLATIONS>;

// ─── CRC-8 ──────────────────────────────────────────────────────────────────

/// Bit-serial CRC-8, polynomial 0x07, initial value 0, no reflection.
///
/// XOR each byte into the register, then shift eight times, folding in the
/// polynomial whenever the top bit falls out.
///
/// ```
/// use rpp_core::header::crc8;
/// assert_eq!(crc8(b"123456789"), 0xF4);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0x00;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// `true` when `data` is header-sized and its CRC byte matches bytes 0–16.
pub fn verify_crc(data: &[u8]) -> bool {
    data.len() == HEADER_SIZE && crc8(&data[..HEADER_SIZE - 1]) == data[HEADER_SIZE - 1]
}

// ─── Bit layout ─────────────────────────────────────────────────────────────

/// A named bit range inside the header. Offsets count from the MSB of byte 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitField {
    /// Field name used in range errors.
    pub name: &'static str,
    /// First bit of the field.
    pub offset: u16,
    /// Width in bits, 1..=32.
    pub width: u8,
}

impl BitField {
    const fn new(name: &'static str, offset: u16, width: u8) -> Self {
        Self { name, offset, width }
    }

    /// Largest value the field can hold.
    pub const fn max(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Bit just past the end of the field.
    pub const fn end(&self) -> u16 {
        self.offset + self.width as u16
    }

    /// Read the field, MSB first.
    fn get(&self, buf: &[u8; HEADER_SIZE]) -> u32 {
        let mut value = 0u32;
        for pos in self.offset..self.end() {
            let bit = (buf[pos as usize / 8] >> (7 - pos % 8)) & 1;
            value = (value << 1) | bit as u32;
        }
        value
    }

    /// Write the field, MSB first. Fails instead of truncating.
    fn put(&self, buf: &mut [u8; HEADER_SIZE], value: u32) -> Result<(), HeaderError> {
        if value > self.max() {
            return Err(HeaderError::Range {
                field: self.name,
                value,
                max: self.max(),
            });
        }
        for (i, pos) in (self.offset..self.end()).enumerate() {
            let bit = ((value >> (self.width as usize - 1 - i)) & 1) as u8;
            let mask = 1u8 << (7 - pos % 8);
            let byte = &mut buf[pos as usize / 8];
            *byte = (*byte & !mask) | (bit * mask);
        }
        Ok(())
    }
}

/// Field declarations for the v2.0 layout, in wire order.
pub mod layout {
    use super::BitField;

    /// Opaque routing address.
    pub const ADDRESS: BitField = BitField::new("address", 0, 32);
    /// Packet identifier.
    pub const PACKET_ID: BitField = BitField::new("packet_id", 32, 32);
    /// Origin reference.
    pub const ORIGIN_REF: BitField = BitField::new("origin_ref", 64, 16);
    /// Verbal signal strength.
    pub const VERBAL: BitField = BitField::new("verbal", 80, 2);
    /// Somatic consent.
    pub const SOMATIC: BitField = BitField::new("somatic", 82, 4);
    /// Ancestral consent.
    pub const ANCESTRAL: BitField = BitField::new("ancestral", 86, 2);
    /// Phase entropy index.
    pub const PHASE_ENTROPY: BitField = BitField::new("phase_entropy", 88, 5);
    /// Completion trace.
    pub const COMPLETION_TRACE: BitField = BitField::new("completion_trace", 93, 3);
    /// Temporal lock flag.
    pub const TEMPORAL_LOCK: BitField = BitField::new("temporal_lock", 96, 1);
    /// Reserved bits, carried through unchanged.
    pub const RESERVED: BitField = BitField::new("reserved", 97, 3);
    /// Payload type tag.
    pub const PAYLOAD_TYPE: BitField = BitField::new("payload_type", 100, 4);
    /// Fallback vector.
    pub const FALLBACK_VECTOR: BitField = BitField::new("fallback_vector", 104, 8);
    /// Coherence window reference.
    pub const WINDOW_ID: BitField = BitField::new("window_id", 112, 16);
    /// Target phase reference.
    pub const TARGET_PHASE: BitField = BitField::new("target_phase", 128, 8);
    /// CRC-8 over everything above.
    pub const CRC: BitField = BitField::new("crc", 136, 8);

    /// Every field in wire order.
    pub const FIELDS: [BitField; 15] = [
        ADDRESS,
        PACKET_ID,
        ORIGIN_REF,
        VERBAL,
        SOMATIC,
        ANCESTRAL,
        PHASE_ENTROPY,
        COMPLETION_TRACE,
        TEMPORAL_LOCK,
        RESERVED,
        PAYLOAD_TYPE,
        FALLBACK_VECTOR,
        WINDOW_ID,
        TARGET_PHASE,
        CRC,
    ];
}

// ─── Field enums ────────────────────────────────────────────────────────────

/// Ancestral consent inheritance level (2 bits).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AncestralConsent {
    /// No ancestral consent.
    #[default]
    None = 0,
    /// Lineage-verified.
    Inherited = 1,
    /// Granted by an ancestor.
    Delegated = 2,
    /// Self-sovereign.
    Sovereign = 3,
}

impl AncestralConsent {
    /// Decode the low two bits.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => AncestralConsent::None,
            1 => AncestralConsent::Inherited,
            2 => AncestralConsent::Delegated,
            _ => AncestralConsent::Sovereign,
        }
    }
}

/// Payload origin/type tag (4 bits). 0xC–0xF are reserved and preserved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadType {
    /// No payload.
    #[default]
    Empty,
    /// Human-originated.
    Human,
    /// AI-originated.
    Ai,
    /// Scalar value.
    Scalar,
    /// Mixed origin.
    Hybrid,
    /// Partial fragment.
    Fragment,
    /// Command.
    Command,
    /// Query.
    Query,
    /// Response.
    Response,
    /// Keep-alive.
    Heartbeat,
    /// Freeze request.
    Freeze,
    /// Dissolve request.
    Dissolve,
    /// Reserved tag 0xC–0xF.
    Reserved(u8),
}

impl PayloadType {
    /// Lowest nibble a [`PayloadType::Reserved`] tag may carry.
    pub const RESERVED_MIN: u8 = 0xC;

    /// Decode a nibble. Only the low four bits are read.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => PayloadType::Empty,
            0x1 => PayloadType::Human,
            0x2 => PayloadType::Ai,
            0x3 => PayloadType::Scalar,
            0x4 => PayloadType::Hybrid,
            0x5 => PayloadType::Fragment,
            0x6 => PayloadType::Command,
            0x7 => PayloadType::Query,
            0x8 => PayloadType::Response,
            0x9 => PayloadType::Heartbeat,
            0xA => PayloadType::Freeze,
            0xB => PayloadType::Dissolve,
            n => PayloadType::Reserved(n),
        }
    }

    /// Wire value. A hand-built `Reserved` above 0xF fails at encode time.
    pub fn to_nibble(self) -> u8 {
        match self {
            PayloadType::Empty => 0x0,
            PayloadType::Human => 0x1,
            PayloadType::Ai => 0x2,
            PayloadType::Scalar => 0x3,
            PayloadType::Hybrid => 0x4,
            PayloadType::Fragment => 0x5,
            PayloadType::Command => 0x6,
            PayloadType::Query => 0x7,
            PayloadType::Response => 0x8,
            PayloadType::Heartbeat => 0x9,
            PayloadType::Freeze => 0xA,
            PayloadType::Dissolve => 0xB,
            PayloadType::Reserved(n) => n,
        }
    }

    /// `true` for a `Reserved` tag whose nibble belongs to a named tag.
    /// Such a value would decode as that named tag.
    pub fn is_aliased(self) -> bool {
        matches!(self, PayloadType::Reserved(n) if n < Self::RESERVED_MIN)
    }
}

// ─── ConsentHeader ──────────────────────────────────────────────────────────

/// Decoded consent header. Sub-byte fields hold raw integers; their widths
/// are enforced by [`encode`] and reported by [`ConsentHeader::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsentHeader {
    /// Opaque 32-bit routing address. Never interpreted here.
    pub address: u32,
    /// Packet identifier.
    pub packet_id: u32,
    /// Origin reference (sender identity).
    pub origin_ref: u16,
    /// Verbal signal strength, 2 bits (0 none … 3 strong).
    pub verbal: u8,
    /// Somatic consent, 4 bits.
    pub somatic: u8,
    /// Ancestral consent level.
    pub ancestral: AncestralConsent,
    /// Phase entropy index, 5 bits.
    pub phase_entropy: u8,
    /// Completion trace, 3 bits.
    pub completion_trace: u8,
    /// Temporal lock flag.
    pub temporal_lock: bool,
    /// Reserved bits of the temporal byte, 3 bits.
    pub reserved: u8,
    /// Payload type tag.
    pub payload_type: PayloadType,
    /// Fallback vector.
    pub fallback_vector: u8,
    /// Coherence window reference. Zero means unlinked.
    pub window_id: u16,
    /// Target phase reference.
    pub target_phase: u8,
}

impl ConsentHeader {
    /// Header for `address` with full somatic consent and strong verbal signal.
    pub fn new(address: u32) -> Self {
        Self {
            address,
            packet_id: 0,
            origin_ref: 0,
            verbal: 3,
            somatic: 15,
            ancestral: AncestralConsent::None,
            phase_entropy: 0,
            completion_trace: 0,
            temporal_lock: false,
            reserved: 0,
            payload_type: PayloadType::Empty,
            fallback_vector: 0,
            window_id: 0,
            target_phase: 0,
        }
    }

    /// Set the somatic and verbal consent fields.
    pub fn with_consent(mut self, somatic: u8, verbal: u8) -> Self {
        self.somatic = somatic;
        self.verbal = verbal;
        self
    }

    /// Set the packet identifier and origin reference.
    pub fn with_identity(mut self, packet_id: u32, origin_ref: u16) -> Self {
        self.packet_id = packet_id;
        self.origin_ref = origin_ref;
        self
    }

    /// Set the phase entropy and completion trace fields.
    pub fn with_entropy(mut self, phase_entropy: u8, completion_trace: u8) -> Self {
        self.phase_entropy = phase_entropy;
        self.completion_trace = completion_trace;
        self
    }

    /// Set the payload type tag.
    pub fn with_payload_type(mut self, payload_type: PayloadType) -> Self {
        self.payload_type = payload_type;
        self
    }

    /// Set the coherence window reference.
    pub fn with_window(mut self, window_id: u16) -> Self {
        self.window_id = window_id;
        self
    }

    /// Consent state derived from the somatic and verbal fields.
    pub fn consent_state(&self) -> ConsentState {
        derive_consent_state(self.somatic, self.verbal)
    }

    /// `true` when phase entropy is above [`ENTROPY_FALLBACK_THRESHOLD`].
    pub fn needs_fallback(&self) -> bool {
        self.phase_entropy > ENTROPY_FALLBACK_THRESHOLD
    }

    /// `true` when the header references a coherence window.
    pub fn has_window_link(&self) -> bool {
        self.window_id != 0
    }

    /// Pack into 18 bytes. See [`encode`].
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE], HeaderError> {
        encode(self)
    }

    /// Unpack 18 bytes. See [`decode`].
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, HeaderError> {
        decode(bytes)
    }

    /// Length-checked [`decode`] for a borrowed slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HeaderError> {
        let fixed: &[u8; HEADER_SIZE] = bytes.try_into().map_err(|_| HeaderError::Length {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        })?;
        decode(fixed)
    }

    /// Check rule C1 and every sub-byte field width.
    ///
    /// Returns all violations found; an empty list means the header is valid.
    /// Nothing is corrected.
    pub fn validate(&self) -> Violations {
        let mut violations = Violations::new();
        let mut report = |e: ValidationError| {
            // Capacity covers every rule below, so this never drops.
            let _ = violations.push(e);
        };

        if self.somatic < DIMINISHED_THRESHOLD_4BIT && self.completion_trace == 0 {
            report(ValidationError::LowSomaticWithoutTrace { somatic: self.somatic });
        }

        let ranged = [
            (layout::SOMATIC, self.somatic as u32),
            (layout::VERBAL, self.verbal as u32),
            (layout::PHASE_ENTROPY, self.phase_entropy as u32),
            (layout::COMPLETION_TRACE, self.completion_trace as u32),
            (layout::RESERVED, self.reserved as u32),
            (layout::PAYLOAD_TYPE, self.payload_type.to_nibble() as u32),
        ];
        for (field, value) in ranged {
            if value > field.max() {
                report(ValidationError::OutOfRange {
                    field: field.name,
                    value,
                    max: field.max(),
                });
            }
        }

        if self.payload_type.is_aliased() {
            report(ValidationError::AliasedPayloadType {
                nibble: self.payload_type.to_nibble(),
            });
        }

        violations
    }

    /// `true` when [`Self::validate`] reports nothing.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

impl Default for ConsentHeader {
    fn default() -> Self {
        Self::new(0)
    }
}

// ─── Codec ──────────────────────────────────────────────────────────────────

/// Pack a header into its 18-byte wire form and append the CRC.
///
/// Fails with [`HeaderError::Range`] on the first field that exceeds its width,
/// and with [`HeaderError::AliasedPayloadType`] for a `Reserved` tag below 0xC.
pub fn encode(header: &ConsentHeader) -> Result<[u8; HEADER_SIZE], HeaderError> {
    let mut buf = [0u8; HEADER_SIZE];

    layout::ADDRESS.put(&mut buf, header.address)?;
    layout::PACKET_ID.put(&mut buf, header.packet_id)?;
    layout::ORIGIN_REF.put(&mut buf, header.origin_ref as u32)?;
    layout::VERBAL.put(&mut buf, header.verbal as u32)?;
    layout::SOMATIC.put(&mut buf, header.somatic as u32)?;
    layout::ANCESTRAL.put(&mut buf, header.ancestral as u32)?;
    layout::PHASE_ENTROPY.put(&mut buf, header.phase_entropy as u32)?;
    layout::COMPLETION_TRACE.put(&mut buf, header.completion_trace as u32)?;
    layout::TEMPORAL_LOCK.put(&mut buf, header.temporal_lock as u32)?;
    layout::RESERVED.put(&mut buf, header.reserved as u32)?;
    if header.payload_type.is_aliased() {
        return Err(HeaderError::AliasedPayloadType {
            nibble: header.payload_type.to_nibble(),
        });
    }
    layout::PAYLOAD_TYPE.put(&mut buf, header.payload_type.to_nibble() as u32)?;
    layout::FALLBACK_VECTOR.put(&mut buf, header.fallback_vector as u32)?;
    layout::WINDOW_ID.put(&mut buf, header.window_id as u32)?;
    layout::TARGET_PHASE.put(&mut buf, header.target_phase as u32)?;

    let crc = crc8(&buf[..HEADER_SIZE - 1]);
    layout::CRC.put(&mut buf, crc as u32)?;
    Ok(buf)
}

/// Unpack an 18-byte header.
///
/// The CRC over bytes 0–16 is checked first; a mismatch is a
/// [`HeaderError::Checksum`] and no field is read.
pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<ConsentHeader, HeaderError> {
    let computed = crc8(&bytes[..HEADER_SIZE - 1]);
    let stored = layout::CRC.get(bytes) as u8;
    if computed != stored {
        tracing::debug!(computed, stored, "consent header CRC mismatch");
        return Err(HeaderError::Checksum { computed, stored });
    }

    Ok(ConsentHeader {
        address: layout::ADDRESS.get(bytes),
        packet_id: layout::PACKET_ID.get(bytes),
        origin_ref: layout::ORIGIN_REF.get(bytes) as u16,
        verbal: layout::VERBAL.get(bytes) as u8,
        somatic: layout::SOMATIC.get(bytes) as u8,
        ancestral: AncestralConsent::from_bits(layout::ANCESTRAL.get(bytes) as u8),
        phase_entropy: layout::PHASE_ENTROPY.get(bytes) as u8,
        completion_trace: layout::COMPLETION_TRACE.get(bytes) as u8,
        temporal_lock: layout::TEMPORAL_LOCK.get(bytes) == 1,
        reserved: layout::RESERVED.get(bytes) as u8,
        payload_type: PayloadType::from_nibble(layout::PAYLOAD_TYPE.get(bytes) as u8),
        fallback_vector: layout::FALLBACK_VECTOR.get(bytes) as u8,
        window_id: layout::WINDOW_ID.get(bytes) as u16,
        target_phase: layout::TARGET_PHASE.get(bytes) as u8,
    })
}

// ─── SpiralPacket ───────────────────────────────────────────────────────────

/// A header followed by a borrowed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiralPacket<'a> {
    /// Consent header.
    pub header: ConsentHeader,
    /// Payload bytes following the header.
    pub payload: &'a [u8],
}

impl<'a> SpiralPacket<'a> {
    /// Largest payload that keeps the frame within 64 KiB.
    pub const MAX_PAYLOAD: usize = u16::MAX as usize - HEADER_SIZE;

    /// Pair a header with a payload.
    pub fn new(header: ConsentHeader, payload: &'a [u8]) -> Result<Self, HeaderError> {
        if payload.len() > Self::MAX_PAYLOAD {
            return Err(HeaderError::PayloadTooLarge {
                len: payload.len(),
                max: Self::MAX_PAYLOAD,
            });
        }
        Ok(Self { header, payload })
    }

    /// Split a frame into header and payload, verifying the header CRC.
    pub fn parse(data: &'a [u8]) -> Result<Self, HeaderError> {
        if data.len() < HEADER_SIZE {
            return Err(HeaderError::Length {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let (head, payload) = data.split_at(HEADER_SIZE);
        Self::new(ConsentHeader::from_slice(head)?, payload)
    }

    /// Header plus payload length in bytes.
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Write the frame into `out`, returning the number of bytes written.
    pub fn write_to(&self, out: &mut [u8]) -> Result<usize, HeaderError> {
        let total = self.total_size();
        if out.len() < total {
            return Err(HeaderError::Length {
                expected: total,
                actual: out.len(),
            });
        }
        out[..HEADER_SIZE].copy_from_slice(&self.header.encode()?);
        out[HEADER_SIZE..total].copy_from_slice(self.payload);
        Ok(total)
    }

    /// Encode the frame into a fresh buffer.
    #[cfg(feature = "std")]
    pub fn to_vec(&self) -> Result<std::vec::Vec<u8>, HeaderError> {
        let mut out = std::vec![0u8; self.total_size()];
        self.write_to(&mut out)?;
        Ok(out)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConsentHeader {
        ConsentHeader {
            address: 0x1234_5678,
            packet_id: 0xDEAD_BEEF,
            origin_ref: 0x0042,
            verbal: 2,
            somatic: 5,
            ancestral: AncestralConsent::Inherited,
            phase_entropy: 26,
            completion_trace: 5,
            temporal_lock: true,
            reserved: 0,
            payload_type: PayloadType::Heartbeat,
            fallback_vector: 0xA5,
            window_id: 0x1A2B,
            target_phase: 0x7F,
        }
    }

    // ── CRC ───────────────────────────────────────────────────────────────

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xF4);
        assert_eq!(crc8(&[]), 0x00);
        assert_eq!(crc8(&[0x00]), 0x00);
        assert_eq!(crc8(&[0x01]), 0x07);
    }

    // ── Layout ────────────────────────────────────────────────────────────

    #[test]
    fn test_layout_is_contiguous_and_complete() {
        let mut next = 0u16;
        for field in layout::FIELDS {
            assert_eq!(field.offset, next, "gap before `{}`", field.name);
            next = field.end();
        }
        assert_eq!(next as usize, HEADER_BITS);
    }

    #[test]
    fn test_encode_packs_bytes_at_documented_offsets() {
        let bytes = sample().encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&bytes[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&bytes[8..10], &[0x00, 0x42]);
        // verbal 10 | somatic 0101 | ancestral 01
        assert_eq!(bytes[10], 0b10_0101_01);
        // entropy 11010 | trace 101
        assert_eq!(bytes[11], 0b11010_101);
        // lock 1 | reserved 000 | payload 1001
        assert_eq!(bytes[12], 0b1_000_1001);
        assert_eq!(bytes[13], 0xA5);
        assert_eq!(&bytes[14..16], &[0x1A, 0x2B]);
        assert_eq!(bytes[16], 0x7F);
        assert_eq!(bytes[17], crc8(&bytes[..17]));
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let h = sample();
        assert_eq!(decode(&encode(&h).unwrap()).unwrap(), h);

        let reserved = ConsentHeader { reserved: 0b101, payload_type: PayloadType::Reserved(0xE), ..h };
        assert_eq!(decode(&encode(&reserved).unwrap()).unwrap(), reserved);
    }

    // ── Errors ────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_rejects_corrupted_byte() {
        let mut bytes = sample().encode().unwrap();
        bytes[5] ^= 0xFF;
        assert!(matches!(decode(&bytes), Err(HeaderError::Checksum { .. })));
    }

    #[test]
    fn test_decode_rejects_corrupted_crc() {
        let mut bytes = sample().encode().unwrap();
        bytes[17] ^= 0x01;
        let err = decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            HeaderError::Checksum { computed: bytes[17] ^ 0x01, stored: bytes[17] }
        );
    }

    #[test]
    fn test_encode_rejects_over_width_fields() {
        let cases = [
            (ConsentHeader { verbal: 4, ..sample() }, "verbal"),
            (ConsentHeader { somatic: 16, ..sample() }, "somatic"),
            (ConsentHeader { phase_entropy: 32, ..sample() }, "phase_entropy"),
            (ConsentHeader { completion_trace: 8, ..sample() }, "completion_trace"),
            (ConsentHeader { reserved: 8, ..sample() }, "reserved"),
            (ConsentHeader { payload_type: PayloadType::Reserved(0x10), ..sample() }, "payload_type"),
        ];
        for (h, name) in cases {
            match encode(&h) {
                Err(HeaderError::Range { field, .. }) => assert_eq!(field, name),
                other => panic!("expected range error for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_from_slice_checks_length() {
        let err = ConsentHeader::from_slice(&[0u8; 17]).unwrap_err();
        assert_eq!(err, HeaderError::Length { expected: 18, actual: 17 });
    }

    #[test]
    fn test_verify_crc() {
        let bytes = sample().encode().unwrap();
        assert!(verify_crc(&bytes));
        assert!(!verify_crc(&bytes[..17]));
        let mut bad = bytes;
        bad[0] ^= 0x80;
        assert!(!verify_crc(&bad));
    }

    // ── Validation ────────────────────────────────────────────────────────

    #[test]
    fn test_validate_c1() {
        let h = ConsentHeader::new(0).with_consent(3, 0).with_entropy(0, 0);
        let violations = h.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule(), "C1");

        let fixed = h.with_entropy(0, 1);
        assert!(fixed.is_valid());
    }

    #[test]
    fn test_validate_c1_not_applied_at_boundary() {
        let h = ConsentHeader::new(0).with_consent(6, 0).with_entropy(0, 0);
        assert!(h.is_valid());
    }

    #[test]
    fn test_validate_reports_all_violations() {
        let h = ConsentHeader {
            somatic: 20,
            verbal: 9,
            phase_entropy: 40,
            completion_trace: 0,
            ..ConsentHeader::new(0)
        };
        let rules: std::vec::Vec<_> = h.validate().iter().map(|v| v.rule()).collect();
        assert_eq!(rules, ["RANGE", "RANGE", "RANGE"]);

        let both = ConsentHeader { somatic: 2, verbal: 5, ..ConsentHeader::new(0) };
        let rules: std::vec::Vec<_> = both.validate().iter().map(|v| v.rule()).collect();
        assert_eq!(rules, ["C1", "RANGE"]);
    }

    #[test]
    fn test_decode_does_not_validate() {
        let h = ConsentHeader::new(0).with_consent(3, 0);
        let decoded = decode(&encode(&h).unwrap()).unwrap();
        assert!(!decoded.is_valid());
    }

    // ── Derived properties ────────────────────────────────────────────────

    #[test]
    fn test_consent_state_from_fields() {
        assert_eq!(ConsentHeader::new(0).consent_state(), ConsentState::FullConsent);
        assert_eq!(
            ConsentHeader::new(0).with_consent(6, 2).consent_state(),
            ConsentState::Attentive
        );
    }

    #[test]
    fn test_needs_fallback_and_window_link() {
        let h = ConsentHeader::new(0).with_entropy(25, 1);
        assert!(!h.needs_fallback());
        assert!(h.with_entropy(26, 1).needs_fallback());
        assert!(!h.has_window_link());
        assert!(h.with_window(1).has_window_link());
    }

    #[test]
    fn test_payload_type_nibbles() {
        for n in 0..16u8 {
            assert_eq!(PayloadType::from_nibble(n).to_nibble(), n);
        }
        assert_eq!(PayloadType::from_nibble(0xC), PayloadType::Reserved(0xC));
        assert!(!PayloadType::Reserved(0xC).is_aliased());
        assert!(PayloadType::Reserved(0xB).is_aliased());
    }

    #[test]
    fn test_aliased_reserved_payload_is_rejected() {
        let h = ConsentHeader::new(1)
            .with_entropy(0, 1)
            .with_payload_type(PayloadType::Reserved(3));

        let violations = h.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0], ValidationError::AliasedPayloadType { nibble: 3 });
        assert!(!h.is_valid());
        assert_eq!(encode(&h), Err(HeaderError::AliasedPayloadType { nibble: 3 }));

        let named = h.with_payload_type(PayloadType::Scalar);
        assert!(named.is_valid());
        assert_eq!(decode(&encode(&named).unwrap()).unwrap(), named);
    }

    // ── SpiralPacket ──────────────────────────────────────────────────────

    #[test]
    fn test_packet_parse_and_write() {
        let payload = b"Hello, SPIRAL!";
        let packet = SpiralPacket::new(sample(), payload).unwrap();
        assert_eq!(packet.total_size(), HEADER_SIZE + payload.len());

        let mut buf = [0u8; 64];
        let n = packet.write_to(&mut buf).unwrap();
        let parsed = SpiralPacket::parse(&buf[..n]).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn test_packet_errors() {
        assert!(matches!(
            SpiralPacket::parse(&[0u8; 10]),
            Err(HeaderError::Length { expected: 18, actual: 10 })
        ));
        let packet = SpiralPacket::new(sample(), b"abc").unwrap();
        let mut small = [0u8; 20];
        assert!(matches!(packet.write_to(&mut small), Err(HeaderError::Length { .. })));
    }
}
