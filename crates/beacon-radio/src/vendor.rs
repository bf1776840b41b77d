//! Vendor beacon commands: start, stop, set data.
//!
//! Each command is one dispatch with a one-byte status reply. A failed
//! dispatch counts as the reserved transport status; any non-zero status
//! is a failure. Failures are logged here and returned, never retried.

use std::sync::Arc;

use zerocopy::AsBytes;

use beacon_core::wire::{
    BeaconSetData, BeaconStart, ADDRESS_LEN, CMD_BEACON_SET_DATA, CMD_BEACON_START,
    CMD_BEACON_STOP, STATUS_SUCCESS, STATUS_TRANSPORT_FAILED, VENDOR_GROUP,
};

use crate::dispatcher::CommandDispatcher;
use crate::error::BeaconError;

/// Encodes and issues the three vendor beacon commands.
#[derive(Clone)]
pub struct VendorCommands {
    dispatcher: Arc<dyn CommandDispatcher>,
}

impl VendorCommands {
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Start broadcasting the beacon slot with the given timing and address.
    pub fn start(
        &self,
        interval_min_ms: u16,
        interval_max_ms: u16,
        channel_map: u8,
        address_type: u8,
        address: [u8; ADDRESS_LEN],
        power_level: u8,
    ) -> Result<(), BeaconError> {
        let params = BeaconStart::from_millis(
            interval_min_ms,
            interval_max_ms,
            channel_map,
            address_type,
            address,
            power_level,
        );
        self.issue(CMD_BEACON_START, "beacon_start", params.as_bytes())
    }

    pub fn stop(&self) -> Result<(), BeaconError> {
        self.issue(CMD_BEACON_STOP, "beacon_stop", &[])
    }

    /// Replace the advertisement data. At most 254 bytes.
    pub fn set_data(&self, data: &[u8]) -> Result<(), BeaconError> {
        let params = match BeaconSetData::new(data) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "beacon_set_data not sent");
                return Err(BeaconError::CommandRejected {
                    command: CMD_BEACON_SET_DATA,
                    status: STATUS_TRANSPORT_FAILED,
                });
            }
        };
        self.issue(CMD_BEACON_SET_DATA, "beacon_set_data", params.request())
    }

    fn issue(&self, command: u16, name: &'static str, request: &[u8]) -> Result<(), BeaconError> {
        let mut status = [STATUS_SUCCESS];
        if self.dispatcher.dispatch(VENDOR_GROUP, command, request, &mut status) < 0 {
            let err = BeaconError::TransportTimeout { command };
            tracing::error!(command = name, status = STATUS_TRANSPORT_FAILED, "{}", err);
            return Err(err);
        }

        match status[0] {
            STATUS_SUCCESS => {
                tracing::debug!(command = name, bytes = request.len(), "vendor command ok");
                Ok(())
            }
            status => {
                let err = BeaconError::CommandRejected { command, status };
                tracing::error!(command = name, status, "{}", err);
                Err(err)
            }
        }
    }
}
