//! Advertisement payload codecs.
//!
//! The scheduler never looks inside a payload: it asks a [`ProtocolCodec`]
//! how large a message type is, sizes its packet buffer once per session,
//! and has the codec fill that buffer every tick. Codecs are pure.

use crate::message::{MessageDescriptor, ProtocolType};

/// Turns message variants into advertisement bytes.
pub trait ProtocolCodec: Send + Sync {
    /// Exact encoded length of any message of type `protocol`.
    fn required_size(&self, protocol: ProtocolType) -> usize;

    /// Encode `message` into the front of `out`, returning the byte count.
    fn encode_into(&self, message: &MessageDescriptor, out: &mut [u8]) -> Result<usize, CodecError>;

    /// Encode into a freshly allocated buffer of exactly the required size.
    fn encode(&self, message: &MessageDescriptor) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.required_size(message.protocol())];
        let n = self.encode_into(message, &mut out)?;
        out.truncate(n);
        Ok(out)
    }
}

// ── Manufacturer data codec ──────────────────────────────────────────────────

/// AD type for manufacturer-specific data.
pub const AD_TYPE_MANUFACTURER: u8 = 0xff;

/// Company identifier reserved by the Bluetooth SIG for testing.
pub const TEST_COMPANY_ID: u16 = 0xffff;

/// AD length byte, AD type, 2-byte company id, protocol tag.
const HEADER_LEN: usize = 5;

/// Encodes every variant as a single manufacturer-specific AD structure:
///
/// ```text
/// [len] [0xff] [company lo] [company hi] [protocol tag] [variant fields...]
/// ```
///
/// `len` counts every byte after itself. Variant fields are written in
/// declaration order, multi-byte fields little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerDataCodec {
    company_id: u16,
}

impl Default for ManufacturerDataCodec {
    fn default() -> Self {
        Self::new(TEST_COMPANY_ID)
    }
}

impl ManufacturerDataCodec {
    pub fn new(company_id: u16) -> Self {
        Self { company_id }
    }

    pub fn company_id(&self) -> u16 {
        self.company_id
    }

    fn field_len(protocol: ProtocolType) -> usize {
        match protocol {
            ProtocolType::NearbyAction => 2,
            ProtocolType::ProximityPair => 3,
            ProtocolType::AirDrop
            | ProtocolType::AirplayTarget
            | ProtocolType::Handoff
            | ProtocolType::TetheringSource
            | ProtocolType::NearbyInfo => 0,
        }
    }
}

impl ProtocolCodec for ManufacturerDataCodec {
    fn required_size(&self, protocol: ProtocolType) -> usize {
        HEADER_LEN + Self::field_len(protocol)
    }

    fn encode_into(&self, message: &MessageDescriptor, out: &mut [u8]) -> Result<usize, CodecError> {
        let protocol = message.protocol();
        let size = self.required_size(protocol);
        if out.len() < size {
            return Err(CodecError::BufferTooSmall {
                needed: size,
                available: out.len(),
            });
        }

        let company = self.company_id.to_le_bytes();
        out[0] = (size - 1) as u8;
        out[1] = AD_TYPE_MANUFACTURER;
        out[2] = company[0];
        out[3] = company[1];
        out[4] = u8::from(protocol);

        let fields = &mut out[HEADER_LEN..size];
        match *message {
            MessageDescriptor::NearbyAction { flags, action } => {
                fields[0] = flags;
                fields[1] = action;
            }
            MessageDescriptor::ProximityPair { prefix, model } => {
                fields[0] = prefix;
                fields[1..3].copy_from_slice(&model.to_le_bytes());
            }
            MessageDescriptor::AirDrop
            | MessageDescriptor::AirplayTarget
            | MessageDescriptor::Handoff
            | MessageDescriptor::TetheringSource
            | MessageDescriptor::NearbyInfo => {}
        }

        Ok(size)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("packet buffer holds {available} bytes, message needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },
}
