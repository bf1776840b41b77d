use anyhow::Result;

use beacon_core::wire::{CMD_BEACON_START, CMD_BEACON_STOP};
use beacon_radio::{Flow, Input};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Control surface
// ══════════════════════════════════════════════════════════════════════════════

/// Feed a line script through the control surface the way beacond does.
async fn drive(surface: &mut ControlSurface, script: &[&str]) -> Result<Flow> {
    for line in script {
        let input: Input = line.parse()?;
        if surface.handle(input).await == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

#[tokio::test]
async fn test_select_toggle_and_exit() -> Result<()> {
    let (mut surface, controller) = surface()?;

    assert_eq!(drive(&mut surface, &["right", "right", "ok"]).await?, Flow::Continue);
    let status = serde_json::to_value(surface.status())?;
    assert_eq!(status["active"], true);
    assert_eq!(status["selected"], 2);
    assert_eq!(status["bound"], "Action 01");
    assert_eq!(status["protocol"], "Nearby Action");
    assert!(controller.beacon_running());

    assert_eq!(drive(&mut surface, &["back"]).await?, Flow::Exit);
    assert!(!surface.status().active);
    assert!(!controller.beacon_running());
    Ok(())
}

#[tokio::test]
async fn test_delay_keys_restart_running_session() -> Result<()> {
    let (mut surface, controller) = surface()?;

    drive(&mut surface, &["ok"]).await?;
    controller.clear();
    drive(&mut surface, &["up", "up"]).await?;

    assert_eq!(surface.status().delay_ms, 2000);
    assert_eq!(controller.count(CMD_BEACON_STOP), 2);
    assert_eq!(controller.count(CMD_BEACON_START), 2);
    assert!(surface.status().active);

    drive(&mut surface, &["down", "down", "down", "down"]).await?;
    assert_eq!(surface.status().delay_ms, 20);
    surface.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_delay_keys_while_idle_are_silent() -> Result<()> {
    let (mut surface, controller) = surface()?;
    drive(&mut surface, &["up", "down", "down", "up"]).await?;
    assert!(controller.commands().is_empty());
    assert_eq!(surface.status().delay_ms, 100);
    Ok(())
}

#[tokio::test]
async fn test_selection_change_stops_without_restart() -> Result<()> {
    let (mut surface, controller) = surface()?;

    drive(&mut surface, &["ok", "right"]).await?;
    let status = surface.status();
    assert!(!status.active);
    assert_eq!(status.selected, 1);
    assert_eq!(controller.count(CMD_BEACON_START), 1);
    assert_eq!(controller.count(CMD_BEACON_STOP), 1);

    drive(&mut surface, &["ok"]).await?;
    assert_eq!(surface.status().bound.as_deref(), Some("Random Pairing"));
    surface.shutdown().await;
    Ok(())
}

#[test]
fn test_unknown_line_is_rejected() {
    assert!("jump".parse::<Input>().is_err());
}
