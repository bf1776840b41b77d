//! Radio-side error taxonomy.

use beacon_core::wire::STATUS_TRANSPORT_FAILED;

/// Everything that can go wrong between the control surface and the controller.
///
/// Only `AllocationFailure` and `UnknownPayload` stop a session from
/// starting. Command failures are logged where they happen and the
/// scheduler carries on with the next tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BeaconError {
    /// The scan window held no signature. `resolve` never surfaces this;
    /// it substitutes the fallback entry instead.
    #[error("radio command entry point not found in 0x{start:08x}..0x{end:08x}")]
    AddressNotResolved { start: usize, end: usize },

    #[error("dispatch of vendor command 0x{command:03x} failed below the command layer")]
    TransportTimeout { command: u16 },

    #[error("vendor command 0x{command:03x} rejected with status 0x{status:02x}")]
    CommandRejected { command: u16, status: u8 },

    #[error("packet buffer of {size} bytes could not be obtained")]
    AllocationFailure { size: usize },

    #[error("no payload at catalog index {0}")]
    UnknownPayload(usize),
}

impl BeaconError {
    /// Controller status byte equivalent, for command failures.
    pub fn status(&self) -> Option<u8> {
        match self {
            Self::TransportTimeout { .. } => Some(STATUS_TRANSPORT_FAILED),
            Self::CommandRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
