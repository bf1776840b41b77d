//! Advertising scheduler.
//!
//! Owns the single advertising session. Starting a session pauses the
//! platform's own advertising, arms the beacon slot and spawns a worker
//! that re-encodes and pushes the bound payload once per delay. The
//! worker owns the packet buffer while it runs and hands it back when
//! joined, so the foreground never touches packet bytes concurrently.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use beacon_core::wire::{ADDRESS_LEN, MAX_ADV_DATA};

use crate::context::RadioContext;
use crate::error::BeaconError;

/// Shortest delay a worker waits between pushes.
pub const MIN_DELAY_MS: u16 = 1;

pub struct Scheduler {
    ctx: Arc<RadioContext>,
    rng: StdRng,
    session: Option<AdvertisingSession>,
}

struct AdvertisingSession {
    payload_index: usize,
    delay_ms: u16,
    address: [u8; ADDRESS_LEN],
    /// Platform advertising was running before the session.
    resume: bool,
    /// The controller accepted the most recent start command.
    armed: bool,
    packet_len: usize,
    /// `None` while a worker holds the buffer.
    packet: Option<Vec<u8>>,
    worker: Option<Worker>,
}

struct Worker {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<Vec<u8>>,
}

impl Scheduler {
    pub fn new(ctx: Arc<RadioContext>) -> Self {
        Self::with_rng(ctx, StdRng::from_entropy())
    }

    /// Scheduler drawing addresses and random substitutes from `rng`.
    pub fn with_rng(ctx: Arc<RadioContext>, rng: StdRng) -> Self {
        Self {
            ctx,
            rng,
            session: None,
        }
    }

    pub fn context(&self) -> &Arc<RadioContext> {
        &self.ctx
    }

    pub fn is_advertising(&self) -> bool {
        self.session.is_some()
    }

    /// Catalog index of the payload being advertised.
    pub fn bound_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.payload_index)
    }

    pub fn delay_ms(&self) -> Option<u16> {
        self.session.as_ref().map(|s| s.delay_ms)
    }

    pub fn packet_len(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.packet_len)
    }

    pub fn address(&self) -> Option<[u8; ADDRESS_LEN]> {
        self.session.as_ref().map(|s| s.address)
    }

    /// Whether the controller accepted the session's last start command.
    pub fn armed(&self) -> Option<bool> {
        self.session.as_ref().map(|s| s.armed)
    }

    /// Start advertising catalog row `payload_index` every `delay_ms`.
    ///
    /// No-op if a session is already running. Must be called from within
    /// a tokio runtime. A rejected start command leaves the session up with
    /// [`armed`](Self::armed) false; only a bad index or a failed buffer
    /// allocation abort. Delays below [`MIN_DELAY_MS`] are raised to it.
    pub fn start(&mut self, payload_index: usize, delay_ms: u16) -> Result<(), BeaconError> {
        if self.session.is_some() {
            return Ok(());
        }
        let delay_ms = delay_ms.max(MIN_DELAY_MS);

        let payload = self
            .ctx
            .catalog
            .get(payload_index)
            .ok_or(BeaconError::UnknownPayload(payload_index))?;
        let packet_len = self.ctx.codec.required_size(payload.protocol());
        let packet = allocate_packet(packet_len)?;

        let mut address = [0u8; ADDRESS_LEN];
        self.rng.fill(&mut address);

        let resume = self.ctx.host.is_active();
        self.ctx.host.stop_advertising();

        let mut session = AdvertisingSession {
            payload_index,
            delay_ms,
            address,
            resume,
            armed: false,
            packet_len,
            packet: Some(packet),
            worker: None,
        };
        session.start_worker(&self.ctx, self.rng.gen())?;
        session.arm(&self.ctx);

        tracing::info!(
            payload = %payload.title,
            protocol = payload.protocol().name(),
            delay_ms,
            bytes = packet_len,
            address = %hex::encode(address),
            resume,
            armed = session.armed,
            "advertising started"
        );
        self.session = Some(session);
        Ok(())
    }

    /// Stop the running session. No-op when idle.
    pub async fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.stop_worker().await;
        session.disarm(&self.ctx);
        drop(session.packet.take());

        if session.resume {
            self.ctx.host.start_advertising();
        }
        tracing::info!(payload_index = session.payload_index, "advertising stopped");
    }

    pub async fn toggle(&mut self, payload_index: usize, delay_ms: u16) -> Result<(), BeaconError> {
        if self.is_advertising() {
            self.stop().await;
            Ok(())
        } else {
            self.start(payload_index, delay_ms)
        }
    }

    /// Change the interval of the running session.
    ///
    /// The worker is joined and the beacon slot stopped, then both are
    /// started again with the new delay; payload, address and buffer are
    /// kept. Issues nothing when idle. Delays below [`MIN_DELAY_MS`] are
    /// raised to it.
    pub async fn set_delay(&mut self, delay_ms: u16) -> Result<(), BeaconError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let delay_ms = delay_ms.max(MIN_DELAY_MS);

        session.stop_worker().await;
        session.disarm(&self.ctx);

        session.delay_ms = delay_ms;
        if let Err(e) = session.start_worker(&self.ctx, self.rng.gen()) {
            tracing::error!(error = %e, "advertising abandoned");
            let resume = session.resume;
            self.session = None;
            if resume {
                self.ctx.host.start_advertising();
            }
            return Err(e);
        }
        session.arm(&self.ctx);

        tracing::info!(delay_ms, armed = session.armed, "advertising interval changed");
        Ok(())
    }
}

impl AdvertisingSession {
    fn start_worker(&mut self, ctx: &Arc<RadioContext>, seed: u64) -> Result<(), BeaconError> {
        let packet = match self.packet.take() {
            Some(packet) => packet,
            None => allocate_packet(self.packet_len)?,
        };
        let ticker = Ticker::new(ctx.clone(), self.payload_index, StdRng::seed_from_u64(seed));
        let delay = Duration::from_millis(u64::from(self.delay_ms));

        let (shutdown, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_worker(ticker, packet, delay, rx));
        self.worker = Some(Worker { shutdown, handle });
        Ok(())
    }

    /// Signal the worker and wait for it to hand the buffer back.
    async fn stop_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.shutdown.send(());
        match worker.handle.await {
            Ok(packet) => self.packet = Some(packet),
            Err(e) => tracing::error!(error = %e, "advertising worker failed"),
        }
    }

    /// Issue the start command for the current delay and record the outcome.
    fn arm(&mut self, ctx: &RadioContext) {
        let radio = &ctx.radio;
        let result = ctx.commands.start(
            self.delay_ms,
            self.delay_ms,
            radio.channel_map,
            radio.address_type,
            self.address,
            radio.power_level,
        );
        if let Err(e) = &result {
            tracing::warn!(error = %e, payload_index = self.payload_index, "beacon slot not armed");
        }
        self.armed = result.is_ok();
    }

    fn disarm(&mut self, ctx: &RadioContext) {
        if let Err(e) = ctx.commands.stop() {
            tracing::warn!(error = %e, payload_index = self.payload_index, "beacon slot stop failed");
        }
        self.armed = false;
    }
}

fn allocate_packet(size: usize) -> Result<Vec<u8>, BeaconError> {
    if size == 0 || size > MAX_ADV_DATA {
        return Err(BeaconError::AllocationFailure { size });
    }
    let mut packet = Vec::new();
    packet
        .try_reserve_exact(size)
        .map_err(|_| BeaconError::AllocationFailure { size })?;
    packet.resize(size, 0);
    Ok(packet)
}

// ── Worker ───────────────────────────────────────────────────────────────────

/// One advertisement refresh: pick the message, encode it, push it.
pub struct Ticker {
    ctx: Arc<RadioContext>,
    payload_index: usize,
    rng: StdRng,
}

impl Ticker {
    pub fn new(ctx: Arc<RadioContext>, payload_index: usize, rng: StdRng) -> Self {
        Self {
            ctx,
            payload_index,
            rng,
        }
    }

    /// Returns whether the controller accepted the new data.
    pub fn tick(&mut self, packet: &mut [u8]) -> bool {
        let Some(payload) = self.ctx.catalog.get(self.payload_index) else {
            tracing::warn!(payload_index = self.payload_index, "bound payload vanished");
            return false;
        };

        let message = if payload.random {
            let drawn = self
                .ctx
                .randoms
                .draw(payload.protocol(), &mut self.rng)
                .and_then(|i| self.ctx.catalog.get(i));
            match drawn {
                Some(substitute) => substitute.message,
                None => {
                    tracing::warn!(protocol = payload.protocol().name(), "random pool empty");
                    return false;
                }
            }
        } else {
            payload.message
        };

        let len = match self.ctx.codec.encode_into(&message, packet) {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!(error = %e, payload = %payload.title, "encode failed");
                return false;
            }
        };

        let data = &packet[..len];
        tracing::trace!(data = %hex::encode(data), "advertisement data");
        self.ctx.commands.set_data(data).is_ok()
    }
}

async fn run_worker(
    mut ticker: Ticker,
    mut packet: Vec<u8>,
    delay: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Vec<u8> {
    tracing::debug!(delay_ms = delay.as_millis() as u64, "advertising worker running");
    loop {
        ticker.tick(&mut packet);

        tokio::select! {
            _ = shutdown.recv() => break,
            _ = time::sleep(delay) => {}
        }
    }
    tracing::debug!("advertising worker stopped");
    packet
}
