//! Configuration system for the beacon daemon.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $BEACON_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/beacon/config.toml
//!   3. ~/.config/beacon/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codec::TEST_COMPANY_ID;
use crate::wire::{ALL_CHANNELS, DEFAULT_POWER_LEVEL};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub firmware: FirmwareConfig,
    pub radio: RadioConfig,
    pub scheduler: SchedulerConfig,
    pub catalog: CatalogConfig,
}

/// Where to look for the radio command entry point.
///
/// Defaults match the one firmware build the fallback address was
/// verified against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// First address scanned (inclusive).
    pub scan_start: usize,
    /// End of the scanned range (exclusive).
    pub scan_end: usize,
    /// Constant the compiler embeds a fixed distance after the entry point.
    pub signature: u32,
    /// Distance from the entry point to the signature, in bytes.
    pub signature_offset: usize,
    /// Entry point used when the scan finds nothing.
    pub fallback_entry: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Primary advertising channels, bit 0 = channel 37.
    pub channel_map: u8,
    /// 0x00 public, 0x01 random.
    pub address_type: u8,
    /// Power amplifier level passed to the beacon start command.
    pub power_level: u8,
    /// Company identifier written by the manufacturer-data codec.
    pub company_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay presets in milliseconds, ascending.
    pub delays_ms: Vec<u16>,
    /// Preset selected at startup.
    pub initial_delay_index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog file. Empty = built-in catalog.
    pub path: Option<PathBuf>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            scan_start: 0x0800_0140,
            scan_end: 0x0808_00ec,
            signature: 0x3368_0446,
            signature_offset: 6,
            fallback_entry: 0x0801_61e8,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel_map: ALL_CHANNELS,
            address_type: 0x00,
            power_level: DEFAULT_POWER_LEVEL,
            company_id: TEST_COMPANY_ID,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delays_ms: vec![
                20, 50, 100, 150, 200, 300, 400, 500, 750, 1000, 1500, 2000, 2500, 3000, 4000,
                5000,
            ],
            initial_delay_index: 0,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("beacon")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid scheduler.delays_ms: {0}")]
    InvalidDelays(&'static str),
    #[error("invalid firmware scan range 0x{0:08x}..0x{1:08x}")]
    InvalidScanRange(usize, usize),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BeaconConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            BeaconConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BEACON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&BeaconConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Reject settings the scheduler and resolver cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delays = &self.scheduler.delays_ms;
        if delays.is_empty() {
            return Err(ConfigError::InvalidDelays("no presets"));
        }
        if delays.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidDelays("presets must be strictly ascending"));
        }
        if delays[0] == 0 {
            return Err(ConfigError::InvalidDelays("presets must be non-zero"));
        }
        if self.firmware.scan_end <= self.firmware.scan_start {
            return Err(ConfigError::InvalidScanRange(
                self.firmware.scan_start,
                self.firmware.scan_end,
            ));
        }
        Ok(())
    }

    /// Initial delay preset index, clamped to the preset list.
    pub fn initial_delay_index(&self) -> usize {
        self.scheduler
            .initial_delay_index
            .min(self.scheduler.delays_ms.len().saturating_sub(1))
    }

    /// Apply BEACON_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BEACON_CATALOG__PATH") {
            self.catalog.path = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Ok(v) = std::env::var("BEACON_RADIO__POWER_LEVEL") {
            if let Ok(p) = v.parse() {
                self.radio.power_level = p;
            }
        }
        if let Ok(v) = std::env::var("BEACON_SCHEDULER__INITIAL_DELAY_INDEX") {
            if let Ok(i) = v.parse() {
                self.scheduler.initial_delay_index = i;
            }
        }
    }
}
