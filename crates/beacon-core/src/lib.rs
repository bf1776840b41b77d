//! beacon-core — message model, vendor wire format, codecs, catalog and config.
//! The radio and daemon crates depend on this one.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod message;
pub mod wire;

pub use catalog::{Catalog, CatalogError, RandomIndex};
pub use codec::{ManufacturerDataCodec, ProtocolCodec};
pub use message::{MessageDescriptor, PayloadDescriptor, ProtocolType};
