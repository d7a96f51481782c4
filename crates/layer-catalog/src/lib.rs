//! Layer Catalog extraction.
//!
//! Reads a Geocortex Layer Catalog site file, looks up the service item id
//! of every map service layer it lists, and exports the result as CSV:
//!
//! - [`catalog`]: parse the site document and walk its `MapServices` and
//!   `Layers` sections.
//! - [`resolver`]: query a service endpoint (`?f=pjson`) for its
//!   `serviceItemId`.
//! - [`export`]: write rows as CSV.
//! - [`pipeline`]: run the three in order.

pub mod catalog;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod resolver;

pub use catalog::{read_catalog, CatalogDocument, DiscoveredLayer};
pub use error::{Error, ResolveCause, Result};
pub use pipeline::{LayerRecord, Pipeline, PipelineOptions, RunSummary, HEADER};
pub use resolver::{HttpResolver, ServiceResolver, TransportConfig};
