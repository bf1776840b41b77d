//! Message model for proximity-discovery advertisements.
//!
//! A catalog row ([`PayloadDescriptor`]) names one message variant
//! ([`MessageDescriptor`]). Variants are keyed by [`ProtocolType`]; each
//! carries its own fixed fields. Turning a variant into bytes is the
//! codec's job, see [`crate::codec`].

use serde::{Deserialize, Serialize};

/// Protocol type discriminator. The value is the tag byte the
/// manufacturer-data codec writes ahead of the variant fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProtocolType {
    AirDrop = 0x01,
    ProximityPair = 0x02,
    AirplayTarget = 0x03,
    Handoff = 0x04,
    TetheringSource = 0x05,
    NearbyAction = 0x06,
    NearbyInfo = 0x07,
}

impl ProtocolType {
    /// Every protocol type, in display order.
    pub const ALL: [ProtocolType; 7] = [
        ProtocolType::AirDrop,
        ProtocolType::ProximityPair,
        ProtocolType::AirplayTarget,
        ProtocolType::Handoff,
        ProtocolType::TetheringSource,
        ProtocolType::NearbyAction,
        ProtocolType::NearbyInfo,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::AirDrop),
            0x02 => Some(Self::ProximityPair),
            0x03 => Some(Self::AirplayTarget),
            0x04 => Some(Self::Handoff),
            0x05 => Some(Self::TetheringSource),
            0x06 => Some(Self::NearbyAction),
            0x07 => Some(Self::NearbyInfo),
            _ => None,
        }
    }

    /// Short human-readable name, shown next to the selected payload.
    pub fn name(self) -> &'static str {
        match self {
            Self::AirDrop => "AirDrop",
            Self::ProximityPair => "Proximity Pair",
            Self::AirplayTarget => "AirPlay Target",
            Self::Handoff => "Handoff",
            Self::TetheringSource => "Tethering Source",
            Self::NearbyAction => "Nearby Action",
            Self::NearbyInfo => "Nearby Info",
        }
    }
}

impl From<ProtocolType> for u8 {
    fn from(t: ProtocolType) -> u8 {
        t as u8
    }
}

/// One concrete message variant.
///
/// In catalog files the variant is selected by a `type` key, e.g.
/// `message = { type = "proximity_pair", prefix = 1, model = 0x0001 }`.
/// Fields left out default to zero, which is how random catalog rows
/// name a type without fixing any data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageDescriptor {
    AirDrop,
    AirplayTarget,
    Handoff,
    TetheringSource,
    NearbyAction {
        #[serde(default)]
        flags: u8,
        #[serde(default)]
        action: u8,
    },
    NearbyInfo,
    ProximityPair {
        #[serde(default)]
        prefix: u8,
        #[serde(default)]
        model: u16,
    },
}

impl MessageDescriptor {
    pub fn protocol(&self) -> ProtocolType {
        match self {
            Self::AirDrop => ProtocolType::AirDrop,
            Self::AirplayTarget => ProtocolType::AirplayTarget,
            Self::Handoff => ProtocolType::Handoff,
            Self::TetheringSource => ProtocolType::TetheringSource,
            Self::NearbyAction { .. } => ProtocolType::NearbyAction,
            Self::NearbyInfo => ProtocolType::NearbyInfo,
            Self::ProximityPair { .. } => ProtocolType::ProximityPair,
        }
    }
}

/// A catalog row. Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadDescriptor {
    pub title: String,

    #[serde(default)]
    pub text: String,

    /// When set, the row's own message fields are ignored and every
    /// scheduler tick substitutes a random non-random row of the same type.
    #[serde(default)]
    pub random: bool,

    pub message: MessageDescriptor,
}

impl PayloadDescriptor {
    pub fn protocol(&self) -> ProtocolType {
        self.message.protocol()
    }
}
