mod base;
mod pdr3;
mod s23;
pub use base::{
    band_column, randoms, CatalogAdapter, Column, RawCatalog, SchemaColumns, SchemaError,
};
pub use pdr3::{Pdr3Adapter, PDR3_COLUMNS};
pub use s23::{S23Adapter, S23_COLUMNS};

use crate::utils::enums::SchemaVersion;

/// The adapter reading tract files of a given schema revision.
pub fn adapter_for(version: SchemaVersion) -> Box<dyn CatalogAdapter> {
    match version {
        SchemaVersion::Pdr3 => Box::new(Pdr3Adapter),
        SchemaVersion::S23 => Box::new(S23Adapter),
    }
}
