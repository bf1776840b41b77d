//! Control surface: selection and delay cursors on top of the scheduler.
//!
//! Whatever drives the device (a menu, a line protocol, a test) talks to
//! [`ControlSurface`] through [`Input`] events and reads [`Status`] back.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BeaconError;
use crate::scheduler::Scheduler;

/// One user event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    Ok,
    Back,
}

impl FromStr for Input {
    type Err = UnknownInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "ok" => Ok(Self::Ok),
            "back" => Ok(Self::Back),
            other => Err(UnknownInput(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown input '{0}' (expected up, down, left, right, ok or back)")]
pub struct UnknownInput(pub String);

/// Whether the driver should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Snapshot for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub active: bool,
    pub selected: usize,
    pub total: usize,
    pub title: String,
    pub protocol: &'static str,
    pub random: bool,
    pub delay_ms: u16,
    /// Title of the payload on air, if any.
    pub bound: Option<String>,
    /// Whether the controller accepted the beacon start; `None` when idle.
    pub armed: Option<bool>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {} ({}) {}ms {}",
            self.selected + 1,
            self.total,
            self.title,
            self.protocol,
            self.delay_ms,
            if self.active { "ON" } else { "off" }
        )
    }
}

pub struct ControlSurface {
    scheduler: Scheduler,
    delays: Vec<u16>,
    selected: usize,
    delay_index: usize,
}

impl ControlSurface {
    /// `delays` must be non-empty and ascending; the config layer checks
    /// that. An out-of-range `initial_delay_index` is clamped.
    pub fn new(scheduler: Scheduler, delays: Vec<u16>, initial_delay_index: usize) -> Self {
        let delay_index = initial_delay_index.min(delays.len().saturating_sub(1));
        Self {
            scheduler,
            delays,
            selected: 0,
            delay_index,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn delay_ms(&self) -> u16 {
        self.delays.get(self.delay_index).copied().unwrap_or_default()
    }

    /// Move the selection down the catalog. Stops a running session first;
    /// the new row goes on air with the next toggle.
    pub async fn select_next(&mut self) {
        let last = self.scheduler.context().catalog.len().saturating_sub(1);
        if self.selected < last {
            self.scheduler.stop().await;
            self.selected += 1;
        }
    }

    pub async fn select_prev(&mut self) {
        if self.selected > 0 {
            self.scheduler.stop().await;
            self.selected -= 1;
        }
    }

    /// Next longer delay preset. Restarts the worker if advertising.
    pub async fn delay_up(&mut self) -> Result<(), BeaconError> {
        if self.delay_index + 1 < self.delays.len() {
            self.delay_index += 1;
            self.scheduler.set_delay(self.delay_ms()).await?;
        }
        Ok(())
    }

    pub async fn delay_down(&mut self) -> Result<(), BeaconError> {
        if self.delay_index > 0 {
            self.delay_index -= 1;
            self.scheduler.set_delay(self.delay_ms()).await?;
        }
        Ok(())
    }

    pub async fn toggle(&mut self) -> Result<(), BeaconError> {
        let delay = self.delay_ms();
        self.scheduler.toggle(self.selected, delay).await
    }

    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
    }

    /// Apply one input. Errors are logged; only `Back` ends the loop.
    pub async fn handle(&mut self, input: Input) -> Flow {
        let result = match input {
            Input::Up => self.delay_up().await,
            Input::Down => self.delay_down().await,
            Input::Left => {
                self.select_prev().await;
                Ok(())
            }
            Input::Right => {
                self.select_next().await;
                Ok(())
            }
            Input::Ok => self.toggle().await,
            Input::Back => {
                self.shutdown().await;
                return Flow::Exit;
            }
        };
        if let Err(e) = result {
            tracing::warn!(?input, error = %e, "input failed");
        }
        Flow::Continue
    }

    pub fn status(&self) -> Status {
        let catalog = &self.scheduler.context().catalog;
        let (title, protocol, random) = match catalog.get(self.selected) {
            Some(p) => (p.title.clone(), p.protocol().name(), p.random),
            None => (String::new(), "", false),
        };
        let bound = self
            .scheduler
            .bound_index()
            .and_then(|i| catalog.get(i))
            .map(|p| p.title.clone());

        Status {
            active: self.scheduler.is_advertising(),
            selected: self.selected,
            total: catalog.len(),
            title,
            protocol,
            random,
            delay_ms: self.delay_ms(),
            bound,
            armed: self.scheduler.armed(),
        }
    }
}
