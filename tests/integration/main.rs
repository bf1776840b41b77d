//! beacon integration test harness.
//!
//! Drives the full stack (resolver, vendor commands, scheduler, control
//! surface) against the simulated controller firmware. No hardware or
//! privileges needed:
//!
//!   cargo test --test integration

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use beacon_core::config::{FirmwareConfig, RadioConfig};
use beacon_core::{Catalog, ManufacturerDataCodec};
use beacon_radio::{
    resolve, ControlSurface, RadioContext, Scheduler, SimController, SimulatedFirmware,
};

mod control;
mod resolution;
mod session;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Where the simulated request routine lives unless a test says otherwise.
pub const SIM_ENTRY: usize = 0x0800_4000;

/// Delay presets used by the control-surface tests.
pub const DELAYS: [u16; 5] = [20, 100, 500, 2000, 5000];

/// Firmware settings over a small scan window, to keep images cheap.
pub fn small_firmware() -> FirmwareConfig {
    FirmwareConfig {
        scan_start: 0x0800_0000,
        scan_end: 0x0801_0000,
        fallback_entry: 0x0800_8000,
        ..FirmwareConfig::default()
    }
}

/// Resolve `image` and bind a controller through the result.
pub fn bind(image: &SimulatedFirmware, firmware: &FirmwareConfig) -> Arc<SimController> {
    let handle = resolve(&image.window(), firmware);
    image.controller(handle)
}

/// Radio context over the built-in catalog, talking to `controller`.
pub fn context(controller: &Arc<SimController>) -> Result<Arc<RadioContext>> {
    let catalog = Catalog::builtin().context("built-in catalog")?;
    RadioContext::new(
        catalog,
        Arc::new(ManufacturerDataCodec::default()),
        controller.clone(),
        controller.clone(),
        RadioConfig::default(),
    )
    .context("radio context")
}

pub fn scheduler(ctx: Arc<RadioContext>) -> Scheduler {
    Scheduler::with_rng(ctx, StdRng::seed_from_u64(0x5eed))
}

/// A control surface on a correctly resolved simulated controller.
pub fn surface() -> Result<(ControlSurface, Arc<SimController>)> {
    let firmware = small_firmware();
    let image = SimulatedFirmware::with_entry(&firmware, SIM_ENTRY);
    let controller = bind(&image, &firmware);
    let ctx = context(&controller)?;
    Ok((ControlSurface::new(scheduler(ctx), DELAYS.to_vec(), 1), controller))
}
