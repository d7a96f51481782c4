//! Catalog reader: parse a Layer Catalog site file and list its layers.

pub mod document;
pub mod walker;

pub use document::{CatalogDocument, Element};
pub use walker::{strip_connection_prefix, DiscoveredLayer};

use crate::error::Result;
use std::path::Path;

/// Open the catalog at `path` and list every layer in document order.
pub fn read_catalog(path: &Path) -> Result<Vec<DiscoveredLayer>> {
    CatalogDocument::open(path)?.discover_layers()
}
