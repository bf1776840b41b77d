//! Vendor beacon command wire format.
//!
//! These are the parameter blocks of the three vendor-specific HCI
//! commands that drive the controller's additional-beacon slot. The
//! controller firmware reads them byte for byte, so every field, every
//! size and the field order are part of the wire format.
//!
//! All types are #[repr(C, packed)] for deterministic layout and use
//! zerocopy derives for safe, allocation-free serialization. Multi-byte
//! fields are explicitly little-endian. There is no unsafe code in this
//! module.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Command identifiers ──────────────────────────────────────────────────────

/// Vendor-specific command group (OGF).
pub const VENDOR_GROUP: u16 = 0x3f;

/// Start the additional beacon.
pub const CMD_BEACON_START: u16 = 0x0b0;

/// Stop the additional beacon.
pub const CMD_BEACON_STOP: u16 = 0x0b1;

/// Replace the additional beacon's advertisement data.
pub const CMD_BEACON_SET_DATA: u16 = 0x0b2;

// ── Status codes ─────────────────────────────────────────────────────────────

/// Status byte returned by the controller on success.
pub const STATUS_SUCCESS: u8 = 0x00;

/// Reserved status substituted when the dispatch call itself fails
/// before the controller produced a status byte.
pub const STATUS_TRANSPORT_FAILED: u8 = 0xff;

// ── Limits and defaults ──────────────────────────────────────────────────────

/// Largest parameter block a single command may carry.
pub const MAX_COMMAND_PARAMS: usize = 255;

/// Largest advertisement payload: the parameter block minus the length prefix.
pub const MAX_ADV_DATA: usize = MAX_COMMAND_PARAMS - 1;

/// Device address length in bytes.
pub const ADDRESS_LEN: usize = 6;

/// Duration of one advertising time unit, in microseconds (0.625 ms).
pub const SLOT_MICROS: u32 = 625;

/// Channel map with all three primary advertising channels (37, 38, 39).
pub const ALL_CHANNELS: u8 = 0b0000_0111;

/// Default transmit power amplifier level.
pub const DEFAULT_POWER_LEVEL: u8 = 0x1f;

/// Convert milliseconds to advertising time units, rounding down.
///
/// `ms / 0.625` is computed as `ms * 1000 / 625` in integers so the
/// result is exact. Values that do not fit saturate at `u16::MAX`.
pub fn millis_to_slots(ms: u16) -> u16 {
    let slots = u32::from(ms) * 1000 / SLOT_MICROS;
    u16::try_from(slots).unwrap_or(u16::MAX)
}

// ── Beacon start ─────────────────────────────────────────────────────────────

/// Parameter block of [`CMD_BEACON_START`].
///
/// Wire size: 13 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct BeaconStart {
    /// Minimum advertising interval, in 0.625 ms units.
    pub interval_min: U16<LittleEndian>,

    /// Maximum advertising interval, in 0.625 ms units.
    pub interval_max: U16<LittleEndian>,

    /// Bit mask of primary advertising channels to use.
    pub channel_map: u8,

    /// 0x00 public, 0x01 random.
    pub own_address_type: u8,

    /// Advertiser address, transmitted as given.
    pub own_address: [u8; ADDRESS_LEN],

    /// Power amplifier level.
    pub pa_level: u8,
}

assert_eq_size!(BeaconStart, [u8; 13]);

impl BeaconStart {
    /// Build a start block from intervals expressed in milliseconds.
    pub fn from_millis(
        interval_min_ms: u16,
        interval_max_ms: u16,
        channel_map: u8,
        own_address_type: u8,
        own_address: [u8; ADDRESS_LEN],
        pa_level: u8,
    ) -> Self {
        Self {
            interval_min: U16::new(millis_to_slots(interval_min_ms)),
            interval_max: U16::new(millis_to_slots(interval_max_ms)),
            channel_map,
            own_address_type,
            own_address,
            pa_level,
        }
    }
}

// ── Beacon set data ──────────────────────────────────────────────────────────

/// Parameter block of [`CMD_BEACON_SET_DATA`].
///
/// The full block is 255 bytes but only `1 + length` of them are sent;
/// see [`BeaconSetData::request`].
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct BeaconSetData {
    /// Number of meaningful bytes in `data`.
    pub length: u8,

    /// Advertisement payload, zero padded.
    pub data: [u8; MAX_ADV_DATA],
}

assert_eq_size!(BeaconSetData, [u8; MAX_COMMAND_PARAMS]);

impl BeaconSetData {
    pub fn new(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() > MAX_ADV_DATA {
            return Err(WireError::AdvDataTooLong(payload.len()));
        }
        let mut block = Self::new_zeroed();
        block.length = payload.len() as u8;
        block.data[..payload.len()].copy_from_slice(payload);
        Ok(block)
    }

    /// The bytes actually put on the wire: length prefix plus payload.
    pub fn request(&self) -> &[u8] {
        &self.as_bytes()[..1 + usize::from(self.length)]
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("advertisement data of {0} bytes exceeds maximum {}", MAX_ADV_DATA)]
    AdvDataTooLong(usize),
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_round_down() {
        assert_eq!(millis_to_slots(20), 32);
        assert_eq!(millis_to_slots(5000), 8000);
        assert_eq!(millis_to_slots(1), 1);
        assert_eq!(millis_to_slots(0), 0);
        // 1.6 * 3 = 4.8
        assert_eq!(millis_to_slots(3), 4);
    }

    #[test]
    fn slots_saturate() {
        assert_eq!(millis_to_slots(u16::MAX), u16::MAX);
    }

    #[test]
    fn start_block_layout() {
        let block = BeaconStart::from_millis(
            100,
            150,
            ALL_CHANNELS,
            0x01,
            [0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6],
            DEFAULT_POWER_LEVEL,
        );
        let bytes = block.as_bytes();
        assert_eq!(bytes.len(), 13);
        // 100 ms = 160 slots = 0x00a0, 150 ms = 240 slots = 0x00f0
        assert_eq!(
            bytes,
            &[0xa0, 0x00, 0xf0, 0x00, 0x07, 0x01, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0x1f]
        );
    }

    #[test]
    fn start_block_reads_back() {
        let block = BeaconStart::from_millis(5000, 5000, ALL_CHANNELS, 0, [0; 6], 0);
        let recovered = BeaconStart::read_from(block.as_bytes()).unwrap();
        assert_eq!(recovered.interval_min.get(), 8000);
        assert_eq!(recovered.interval_max.get(), 8000);
    }

    #[test]
    fn set_data_request_is_prefix_plus_payload() {
        let block = BeaconSetData::new(&[0xde, 0xad, 0xbe]).unwrap();
        assert_eq!(block.request(), &[0x03, 0xde, 0xad, 0xbe]);
    }

    #[test]
    fn set_data_accepts_maximum() {
        let payload = [0x5a; MAX_ADV_DATA];
        let block = BeaconSetData::new(&payload).unwrap();
        assert_eq!(block.request().len(), MAX_COMMAND_PARAMS);
        assert_eq!(block.request()[0], 254);
    }

    #[test]
    fn set_data_rejects_oversize() {
        let payload = [0u8; MAX_ADV_DATA + 1];
        let err = BeaconSetData::new(&payload).unwrap_err();
        assert_eq!(err, WireError::AdvDataTooLong(255));
        assert!(err.to_string().contains("255"));
    }

    #[test]
    fn empty_set_data_is_one_byte() {
        let block = BeaconSetData::new(&[]).unwrap();
        assert_eq!(block.request(), &[0x00]);
    }
}
