//! Process-wide radio state, built once at startup.
//!
//! Holds the catalog, its random index, the codec, the vendor command
//! encoder bound to the resolved dispatcher, and the host advertising
//! hooks. Shared read-only between the foreground and the advertising
//! worker through an `Arc`.

use std::sync::Arc;

use beacon_core::config::RadioConfig;
use beacon_core::{Catalog, CatalogError, ProtocolCodec, RandomIndex};

use crate::dispatcher::CommandDispatcher;
use crate::host::HostAdvertising;
use crate::vendor::VendorCommands;

pub struct RadioContext {
    pub catalog: Catalog,
    pub randoms: RandomIndex,
    pub codec: Arc<dyn ProtocolCodec>,
    pub commands: VendorCommands,
    pub host: Arc<dyn HostAdvertising>,
    pub radio: RadioConfig,
}

impl RadioContext {
    /// Builds the random index; fails if a random row has nothing to draw from.
    pub fn new(
        catalog: Catalog,
        codec: Arc<dyn ProtocolCodec>,
        dispatcher: Arc<dyn CommandDispatcher>,
        host: Arc<dyn HostAdvertising>,
        radio: RadioConfig,
    ) -> Result<Arc<Self>, CatalogError> {
        let randoms = RandomIndex::build(&catalog)?;
        tracing::info!(payloads = catalog.len(), "radio context ready");
        Ok(Arc::new(Self {
            catalog,
            randoms,
            codec,
            commands: VendorCommands::new(dispatcher),
            host,
            radio,
        }))
    }
}
