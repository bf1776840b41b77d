use anyhow::{Context, Result};

use beacon_core::config::FirmwareConfig;
use beacon_core::wire::{CMD_BEACON_START, CMD_BEACON_STOP};
use beacon_radio::{resolve, SimulatedFirmware};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Entry point resolution
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_scanned_entry_drives_controller() -> Result<()> {
    let firmware = small_firmware();
    let image = SimulatedFirmware::with_entry(&firmware, SIM_ENTRY);
    let handle = resolve(&image.window(), &firmware);
    assert_eq!(handle.address(), SIM_ENTRY);
    assert_eq!(handle.entry(), SIM_ENTRY | 1);

    let controller = image.controller(handle);
    let mut s = scheduler(context(&controller)?);
    s.start(2, 100).context("start")?;
    assert!(controller.beacon_running());
    s.stop().await;
    assert!(!controller.beacon_running());
    Ok(())
}

#[tokio::test]
async fn test_fallback_entry_drives_matching_build() -> Result<()> {
    let firmware = small_firmware();
    let image = SimulatedFirmware::without_signature(&firmware);
    let controller = bind(&image, &firmware);

    let mut s = scheduler(context(&controller)?);
    s.start(2, 100).context("start")?;
    assert!(controller.beacon_running());
    s.stop().await;
    assert_eq!(controller.count(CMD_BEACON_START), 1);
    assert_eq!(controller.count(CMD_BEACON_STOP), 1);
    Ok(())
}

#[test]
fn test_default_window_resolves() {
    let firmware = FirmwareConfig::default();
    let entry = firmware.scan_start + 0x2_0000;
    assert_ne!(entry, firmware.fallback_entry);
    let image = SimulatedFirmware::with_entry(&firmware, entry);
    assert_eq!(resolve(&image.window(), &firmware).address(), entry);
}

/// A handle taken from a different build reaches nothing. Every command
/// fails at the transport, but the session itself carries on.
#[tokio::test]
async fn test_wrong_handle_fails_every_command() -> Result<()> {
    let firmware = small_firmware();
    let real = SimulatedFirmware::with_entry(&firmware, SIM_ENTRY);
    let other = SimulatedFirmware::with_entry(&firmware, SIM_ENTRY + 0x100);
    let controller = real.controller(resolve(&other.window(), &firmware));

    let mut s = scheduler(context(&controller)?);
    s.start(2, 20).context("start")?;
    assert!(s.is_advertising());
    tokio::task::yield_now().await;
    s.stop().await;

    assert!(!s.is_advertising());
    assert!(controller.commands().is_empty());
    assert!(!controller.beacon_running());
    Ok(())
}
