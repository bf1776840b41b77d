//! Payload catalog and the per-type random pools.
//!
//! The catalog is an ordered, immutable list of [`PayloadDescriptor`]
//! rows. The built-in one is compiled into the binary; an alternative
//! file with the same schema can be named in the config.
//!
//! [`RandomIndex`] partitions the non-random rows by protocol type. A
//! row marked `random` is served, tick by tick, by a uniform draw from
//! the pool of its type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::message::{PayloadDescriptor, ProtocolType};

const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

/// On-disk shape of a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "payload")]
    payloads: Vec<PayloadDescriptor>,
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<PayloadDescriptor>,
}

impl Catalog {
    pub fn new(entries: Vec<PayloadDescriptor>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(CatalogError::Parse)?;
        Self::new(file.payloads)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PayloadDescriptor> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PayloadDescriptor> {
        self.entries.iter()
    }
}

// ── Random index ─────────────────────────────────────────────────────────────

/// Per-type pools of catalog indices eligible for random substitution.
///
/// Built once at startup; never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RandomIndex {
    pools: BTreeMap<ProtocolType, Vec<usize>>,
}

impl RandomIndex {
    /// Partition `catalog` and check that every random row has a pool to draw from.
    pub fn build(catalog: &Catalog) -> Result<Self, CatalogError> {
        let mut pools: BTreeMap<ProtocolType, Vec<usize>> = BTreeMap::new();
        for (index, entry) in catalog.iter().enumerate() {
            if entry.random {
                continue;
            }
            pools.entry(entry.protocol()).or_default().push(index);
        }

        for entry in catalog.iter().filter(|e| e.random) {
            if !pools.contains_key(&entry.protocol()) {
                return Err(CatalogError::EmptyRandomPool {
                    title: entry.title.clone(),
                    protocol: entry.protocol(),
                });
            }
        }

        tracing::debug!(
            types = pools.len(),
            entries = pools.values().map(Vec::len).sum::<usize>(),
            "random index built"
        );
        Ok(Self { pools })
    }

    /// Catalog indices of the non-random rows of `protocol`.
    pub fn pool(&self, protocol: ProtocolType) -> &[usize] {
        self.pools.get(&protocol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool_size(&self, protocol: ProtocolType) -> usize {
        self.pool(protocol).len()
    }

    /// Uniformly pick one catalog index from the pool of `protocol`.
    /// Draws are independent; repeats are allowed.
    pub fn draw<R: Rng + ?Sized>(&self, protocol: ProtocolType, rng: &mut R) -> Option<usize> {
        let pool = self.pool(protocol);
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng.gen_range(0..pool.len())])
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(toml::de::Error),
    #[error("catalog has no payloads")]
    Empty,
    #[error("random payload '{title}' has no {protocol:?} entries to draw from")]
    EmptyRandomPool { title: String, protocol: ProtocolType },
}
