use std::time::Duration;

use anyhow::{Context, Result};

use beacon_core::wire::{CMD_BEACON_SET_DATA, CMD_BEACON_START};
use beacon_core::{Catalog, ManufacturerDataCodec, ProtocolCodec};
use beacon_radio::{HostAdvertising, SimulatedFirmware};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Advertising sessions
// ══════════════════════════════════════════════════════════════════════════════

fn setup() -> Result<(Scheduler, std::sync::Arc<SimController>)> {
    let firmware = small_firmware();
    let image = SimulatedFirmware::with_entry(&firmware, SIM_ENTRY);
    let controller = bind(&image, &firmware);
    Ok((scheduler(context(&controller)?), controller))
}

/// Every push for a random row is the encoding of some row in its pool.
#[tokio::test(start_paused = true)]
async fn test_random_row_draws_from_pool() -> Result<()> {
    let (mut s, controller) = setup()?;
    let catalog = Catalog::builtin()?;
    let codec = ManufacturerDataCodec::default();

    let random = catalog
        .iter()
        .position(|p| p.random && p.title == "Random Pairing")
        .context("built-in catalog has a random pairing row")?;
    let protocol = catalog.get(random).context("row")?.protocol();
    let allowed: Vec<Vec<u8>> = catalog
        .iter()
        .filter(|p| !p.random && p.protocol() == protocol)
        .map(|p| codec.encode(&p.message))
        .collect::<Result<_, _>>()?;

    s.start(random, 20)?;
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    s.stop().await;

    let pushed: Vec<Vec<u8>> = controller
        .commands()
        .into_iter()
        .filter(|c| c.command == CMD_BEACON_SET_DATA)
        .map(|c| c.params[1..].to_vec())
        .collect();
    assert!(pushed.len() >= 40, "only {} pushes", pushed.len());
    for data in &pushed {
        assert!(allowed.contains(data), "unexpected data {:02x?}", data);
    }

    // 50 draws over 5 variants: at least two distinct ones
    let mut distinct = pushed.clone();
    distinct.sort();
    distinct.dedup();
    assert!(distinct.len() > 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejected_commands_keep_session_up() -> Result<()> {
    let (mut s, controller) = setup()?;
    controller.reject_with(Some(0x0c));

    s.start(2, 50)?;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(s.is_advertising());
    assert!(!controller.beacon_running());
    assert_eq!(controller.count(CMD_BEACON_SET_DATA), 3);

    controller.reject_with(None);
    s.stop().await;
    assert!(!s.is_advertising());
    Ok(())
}

#[tokio::test]
async fn test_host_advertising_is_paused_and_resumed() -> Result<()> {
    let (mut s, controller) = setup()?;
    controller.set_host_active(true);

    s.start(2, 100)?;
    assert!(!controller.is_active());
    s.stop().await;
    assert!(controller.is_active());
    Ok(())
}

#[tokio::test]
async fn test_every_start_uses_fresh_address() -> Result<()> {
    let (mut s, controller) = setup()?;

    s.start(2, 100)?;
    let first = s.address().context("address while advertising")?;
    s.stop().await;
    s.start(2, 100)?;
    let second = s.address().context("address while advertising")?;
    s.stop().await;

    assert_ne!(first, second);
    let starts: Vec<_> = controller
        .commands()
        .into_iter()
        .filter(|c| c.command == CMD_BEACON_START)
        .map(|c| c.params[6..12].to_vec())
        .collect();
    assert_eq!(starts, vec![first.to_vec(), second.to_vec()]);
    Ok(())
}
