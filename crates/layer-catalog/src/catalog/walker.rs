//! Depth-first walk of the fixed catalog schema:
//! `root / site / MapServices / service / Layers / layer`.

use super::document::{CatalogDocument, Element};
use crate::error::Result;

pub const MAP_SERVICES_TAG: &str = "MapServices";
pub const LAYERS_TAG: &str = "Layers";
pub const CONNECTION_STRING_ATTR: &str = "ConnectionString";
pub const DISPLAY_NAME_ATTR: &str = "DisplayName";

/// Token some catalogs put in front of the service endpoint.
pub const CONNECTION_PREFIX: &str = "url=";

/// One layer found in the catalog, before its service id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLayer {
    /// Service endpoint with the `url=` prefix removed.
    pub connection_string: String,
    /// Display name of the hosting service.
    pub service_name: String,
    /// Display name of the layer itself.
    pub layer_name: String,
    /// Tag of the site element the layer was found under.
    pub site: String,
    /// Tag of the service element.
    pub service_tag: String,
    /// 1-based position of the layer within its site.
    pub ordinal: usize,
}

/// Remove one leading `url=` token, if present.
pub fn strip_connection_prefix(connection_string: &str) -> &str {
    connection_string
        .strip_prefix(CONNECTION_PREFIX)
        .unwrap_or(connection_string)
}

impl CatalogDocument {
    /// Walk the document and list every layer in document order.
    ///
    /// Service attributes are only read once one of the service's layers is
    /// reached, so a service without layers is never checked. A missing
    /// attribute aborts the walk.
    pub fn discover_layers(&self) -> Result<Vec<DiscoveredLayer>> {
        let mut found = Vec::new();

        for site in self.root().children() {
            let mut ordinal = 0;
            for map_services in site.children_named(MAP_SERVICES_TAG) {
                for service in map_services.children() {
                    for layers in service.children_named(LAYERS_TAG) {
                        for layer in layers.children() {
                            ordinal += 1;
                            found.push(discover(site, service, layer, ordinal)?);
                        }
                    }
                }
            }
        }

        Ok(found)
    }
}

fn discover(
    site: &Element,
    service: &Element,
    layer: &Element,
    ordinal: usize,
) -> Result<DiscoveredLayer> {
    let connection_string = service.require_attr(CONNECTION_STRING_ATTR)?;
    let service_name = service.require_attr(DISPLAY_NAME_ATTR)?;
    let layer_name = layer.require_attr(DISPLAY_NAME_ATTR)?;

    Ok(DiscoveredLayer {
        connection_string: strip_connection_prefix(connection_string).to_string(),
        service_name: service_name.to_string(),
        layer_name: layer_name.to_string(),
        site: site.tag().to_string(),
        service_tag: service.tag().to_string(),
        ordinal,
    })
}
