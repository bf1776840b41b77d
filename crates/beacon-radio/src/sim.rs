//! Simulated controller firmware.
//!
//! Lets the daemon and the tests run the whole resolve → dispatch →
//! schedule path on a host. [`SimulatedFirmware`] is a synthetic flash
//! image with the signature planted behind a chosen entry point;
//! [`SimController`] answers vendor commands only when it was reached
//! through the right handle, records them, and can be told to fail.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_core::config::FirmwareConfig;
use beacon_core::wire::{CMD_BEACON_START, CMD_BEACON_STOP, STATUS_SUCCESS, VENDOR_GROUP};

use crate::dispatcher::{CommandDispatcher, DispatcherHandle};
use crate::host::HostAdvertising;
use crate::resolver::ScanWindow;

/// Thumb `nop`, little-endian. Filler for the synthetic image.
const NOP: [u8; 2] = [0x00, 0xbf];

// ── Firmware image ───────────────────────────────────────────────────────────

pub struct SimulatedFirmware {
    base: usize,
    image: Vec<u8>,
    routine: usize,
}

impl SimulatedFirmware {
    /// Image covering the configured scan range, with the request routine
    /// at `entry` and its signature `signature_offset` bytes later.
    ///
    /// If the signature would land outside the range it is not planted
    /// and resolution will fall back.
    pub fn with_entry(firmware: &FirmwareConfig, entry: usize) -> Self {
        let mut image = blank_image(firmware);
        let span = entry
            .checked_sub(firmware.scan_start)
            .and_then(|p| p.checked_add(firmware.signature_offset))
            .and_then(|p| Some(p..p.checked_add(4)?));
        match span {
            Some(span) if span.end <= image.len() => {
                image[span].copy_from_slice(&firmware.signature.to_be_bytes());
            }
            _ => tracing::warn!(entry, "simulated entry outside scan range, signature omitted"),
        }
        Self {
            base: firmware.scan_start,
            image,
            routine: entry,
        }
    }

    /// Image of the build the fallback address was taken from: no
    /// signature anywhere, routine at the fallback entry.
    pub fn without_signature(firmware: &FirmwareConfig) -> Self {
        Self {
            base: firmware.scan_start,
            image: blank_image(firmware),
            routine: firmware.fallback_entry,
        }
    }

    pub fn window(&self) -> ScanWindow<'_> {
        ScanWindow::new(self.base, &self.image)
    }

    /// Where the request routine really is.
    pub fn routine(&self) -> usize {
        self.routine
    }

    /// A controller reached through `handle`. It only works if `handle`
    /// points at [`routine`](Self::routine).
    pub fn controller(&self, handle: DispatcherHandle) -> Arc<SimController> {
        SimController::new(DispatcherHandle::from_address(self.routine), handle)
    }
}

fn blank_image(firmware: &FirmwareConfig) -> Vec<u8> {
    let len = firmware.scan_end.saturating_sub(firmware.scan_start);
    NOP.iter().copied().cycle().take(len).collect()
}

// ── Controller ───────────────────────────────────────────────────────────────

/// One command as the controller received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub group: u16,
    pub command: u16,
    pub params: Vec<u8>,
}

#[derive(Debug, Default)]
struct SimState {
    commands: Vec<RecordedCommand>,
    host_active: bool,
    beacon_running: bool,
    reject_status: Option<u8>,
    transport_down: bool,
}

pub struct SimController {
    routine: DispatcherHandle,
    bound: DispatcherHandle,
    state: Mutex<SimState>,
}

impl SimController {
    pub fn new(routine: DispatcherHandle, bound: DispatcherHandle) -> Arc<Self> {
        if routine != bound {
            tracing::warn!(routine = %routine, bound = %bound, "simulated controller bound to wrong entry");
        }
        Arc::new(Self {
            routine,
            bound,
            state: Mutex::new(SimState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state().commands.clone()
    }

    /// Number of recorded commands with id `command`.
    pub fn count(&self, command: u16) -> usize {
        self.state().commands.iter().filter(|c| c.command == command).count()
    }

    pub fn clear(&self) {
        self.state().commands.clear();
    }

    /// Whether the beacon slot is broadcasting, per the accepted start/stop commands.
    pub fn beacon_running(&self) -> bool {
        self.state().beacon_running
    }

    /// Advertisement bytes of the most recent set-data command, prefix stripped.
    pub fn last_data(&self) -> Option<Vec<u8>> {
        self.state()
            .commands
            .iter()
            .rev()
            .find(|c| c.command == beacon_core::wire::CMD_BEACON_SET_DATA)
            .map(|c| c.params.get(1..).unwrap_or_default().to_vec())
    }

    pub fn set_host_active(&self, active: bool) {
        self.state().host_active = active;
    }

    /// Reply to every following command with `status` (None = success).
    pub fn reject_with(&self, status: Option<u8>) {
        self.state().reject_status = status;
    }

    /// Make every following dispatch fail below the command layer.
    pub fn set_transport_down(&self, down: bool) {
        self.state().transport_down = down;
    }
}

impl CommandDispatcher for SimController {
    fn dispatch(&self, group: u16, command: u16, request: &[u8], response: &mut [u8]) -> i32 {
        if self.bound != self.routine {
            return -1;
        }
        let mut state = self.state();
        if state.transport_down {
            return -1;
        }

        state.commands.push(RecordedCommand {
            group,
            command,
            params: request.to_vec(),
        });

        let status = state.reject_status.unwrap_or(STATUS_SUCCESS);
        if status == STATUS_SUCCESS && group == VENDOR_GROUP {
            match command {
                CMD_BEACON_START => state.beacon_running = true,
                CMD_BEACON_STOP => state.beacon_running = false,
                _ => {}
            }
        }
        if let Some(slot) = response.first_mut() {
            *slot = status;
        }
        0
    }
}

impl HostAdvertising for SimController {
    fn is_active(&self) -> bool {
        self.state().host_active
    }

    fn start_advertising(&self) {
        self.state().host_active = true;
    }

    fn stop_advertising(&self) {
        self.state().host_active = false;
    }
}
