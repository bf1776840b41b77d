//! beacond — custom advertisement broadcaster.
//!
//! Reads one command per line from stdin (`up`, `down`, `left`, `right`,
//! `ok`, `back`, `status`) and prints the control status as JSON after
//! each one. Runs against the simulated controller firmware.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use beacon_core::config::BeaconConfig;
use beacon_core::{Catalog, ManufacturerDataCodec};
use beacon_radio::{
    resolve, ControlSurface, Flow, Input, RadioContext, Scheduler, SimulatedFirmware,
};

struct Args {
    no_signature: bool,
    entry: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut parsed = Args {
        no_signature: false,
        entry: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--no-signature" => parsed.no_signature = true,
            "--entry" => {
                i += 1;
                let raw = args.get(i).context("--entry requires an address")?;
                let hex = raw.trim_start_matches("0x");
                parsed.entry = Some(
                    usize::from_str_radix(hex, 16)
                        .with_context(|| format!("invalid entry address '{}'", raw))?,
                );
            }
            other => anyhow::bail!("unknown argument '{}'", other),
        }
        i += 1;
    }
    Ok(parsed)
}

fn print_status(surface: &ControlSurface) -> Result<()> {
    let json = serde_json::to_string(&surface.status()).context("failed to serialize status")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    if let Err(e) = BeaconConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = BeaconConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        BeaconConfig::default()
    });

    let catalog = match &config.catalog.path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::builtin().context("built-in catalog is invalid")?,
    };

    let firmware = &config.firmware;
    let image = if args.no_signature {
        SimulatedFirmware::without_signature(firmware)
    } else {
        let midpoint = firmware.scan_start + (firmware.scan_end - firmware.scan_start) / 2;
        SimulatedFirmware::with_entry(firmware, args.entry.unwrap_or(midpoint & !0x3))
    };
    let handle = resolve(&image.window(), firmware);
    let controller = image.controller(handle);

    let ctx = RadioContext::new(
        catalog,
        Arc::new(ManufacturerDataCodec::new(config.radio.company_id)),
        controller.clone(),
        controller,
        config.radio.clone(),
    )
    .context("catalog rejected")?;

    let scheduler = Scheduler::new(ctx);
    let mut surface = ControlSurface::new(
        scheduler,
        config.scheduler.delays_ms.clone(),
        config.initial_delay_index(),
    );

    tracing::info!(handle = %handle, "beacond ready");
    print_status(&surface)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line != "status" {
                    match line.parse::<Input>() {
                        Ok(input) => {
                            if surface.handle(input).await == Flow::Exit {
                                print_status(&surface)?;
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "ignored");
                            continue;
                        }
                    }
                }
                print_status(&surface)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    surface.shutdown().await;
    tracing::info!("beacond stopped");
    Ok(())
}
