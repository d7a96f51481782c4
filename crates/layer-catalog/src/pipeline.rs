//! Extract, resolve, export.
//!
//! Layers are processed one at a time in catalog order; each lookup finishes
//! before the next layer starts. The output file is only created once every
//! layer has a service id.

use crate::catalog::{read_catalog, DiscoveredLayer};
use crate::error::Result;
use crate::export::export_csv;
use crate::resolver::ServiceResolver;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header row of the export.
pub const HEADER: [&str; 4] = ["Layer URL", "Layer Name", "GXE Display Name", "ServiceID"];

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    pub layer_url: String,
    pub layer_name: String,
    pub gxe_display_name: String,
    pub service_id: String,
}

impl LayerRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.layer_url.clone(),
            self.layer_name.clone(),
            self.gxe_display_name.clone(),
            self.service_id.clone(),
        ]
    }
}

/// Header row followed by one row per record.
pub fn to_rows(records: &[LayerRecord]) -> Vec<Vec<String>> {
    std::iter::once(HEADER.iter().map(|h| h.to_string()).collect())
        .chain(records.iter().map(LayerRecord::to_row))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Reuse a service id already resolved for the same connection string
    /// during this run instead of asking the endpoint again.
    pub cache_service_ids: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache_service_ids: true,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Rows written, header excluded.
    pub layers: usize,
    /// Distinct connection strings seen.
    pub services: usize,
    /// Metadata requests made.
    pub lookups: usize,
    pub output: PathBuf,
}

/// Drives a single run. Holds the per-run service id cache.
pub struct Pipeline<'a> {
    resolver: &'a dyn ServiceResolver,
    options: PipelineOptions,
    resolved: HashMap<String, String>,
    lookups: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(resolver: &'a dyn ServiceResolver, options: PipelineOptions) -> Self {
        Self {
            resolver,
            options,
            resolved: HashMap::new(),
            lookups: 0,
        }
    }

    /// Number of resolver calls made so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Resolve the service id for one layer and build its record.
    pub async fn enrich(&mut self, layer: &DiscoveredLayer) -> Result<LayerRecord> {
        info!(
            site = %layer.site,
            service = %layer.service_name,
            layer = %layer.layer_name,
            "{} - MapServices - {} - Layers - processing layer {}",
            layer.site,
            layer.service_tag,
            layer.ordinal
        );

        let cached = if self.options.cache_service_ids {
            self.resolved.get(&layer.connection_string).cloned()
        } else {
            None
        };

        let service_id = match cached {
            Some(id) => {
                debug!(connection = %layer.connection_string, "service id cache hit");
                id
            }
            None => {
                let id = self.resolver.resolve(&layer.connection_string).await?;
                self.lookups += 1;
                if self.options.cache_service_ids {
                    self.resolved
                        .insert(layer.connection_string.clone(), id.clone());
                }
                id
            }
        };

        Ok(LayerRecord {
            layer_url: layer.connection_string.clone(),
            layer_name: layer.service_name.clone(),
            gxe_display_name: layer.layer_name.clone(),
            service_id,
        })
    }

    /// Enrich every layer in order, stopping at the first failure.
    pub async fn collect(&mut self, layers: &[DiscoveredLayer]) -> Result<Vec<LayerRecord>> {
        let mut records = Vec::with_capacity(layers.len());
        for layer in layers {
            records.push(self.enrich(layer).await?);
        }
        Ok(records)
    }

    /// Read `catalog`, resolve every layer and write the CSV to `output`.
    pub async fn run(&mut self, catalog: &Path, output: &Path) -> Result<RunSummary> {
        info!(catalog = %catalog.display(), "reading layer catalog");
        let layers = read_catalog(catalog)?;
        let services = layers
            .iter()
            .map(|l| l.connection_string.as_str())
            .collect::<HashSet<_>>()
            .len();
        info!(layers = layers.len(), services, "catalog read");

        let records = self.collect(&layers).await?;
        export_csv(output, &to_rows(&records))?;
        info!(output = %output.display(), rows = records.len(), "export written");

        Ok(RunSummary {
            layers: records.len(),
            services,
            lookups: self.lookups,
            output: output.to_path_buf(),
        })
    }
}

/// Resolve `layers` with a fresh pipeline.
pub async fn collect_records(
    layers: &[DiscoveredLayer],
    resolver: &dyn ServiceResolver,
    options: PipelineOptions,
) -> Result<Vec<LayerRecord>> {
    Pipeline::new(resolver, options).collect(layers).await
}

/// Run the whole extract, resolve and export sequence once.
pub async fn run(
    catalog: &Path,
    output: &Path,
    resolver: &dyn ServiceResolver,
    options: PipelineOptions,
) -> Result<RunSummary> {
    Pipeline::new(resolver, options).run(catalog, output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogDocument;
    use crate::error::{Error, ResolveCause};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PARKS: &str = r#"
<LayerCatalog>
  <Site>
    <MapServices>
      <MapService ConnectionString="url=https://svc/MapServer" DisplayName="Parks">
        <Layers>
          <Layer DisplayName="Trails"/>
          <Layer DisplayName="Boundaries"/>
        </Layers>
      </MapService>
    </MapServices>
  </Site>
</LayerCatalog>"#;

    struct FixedResolver {
        id: &'static str,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ServiceResolver for FixedResolver {
        async fn resolve(&self, _connection_string: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.id.to_string())
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl ServiceResolver for FailingResolver {
        async fn resolve(&self, connection_string: &str) -> Result<String> {
            Err(Error::resolution(connection_string, ResolveCause::MissingKey))
        }
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[tokio::test]
    async fn test_parks_scenario_rows() {
        let layers = CatalogDocument::parse_str(PARKS)
            .unwrap()
            .discover_layers()
            .unwrap();
        let resolver = FixedResolver::new("id-001");

        let records = collect_records(&layers, &resolver, PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(
            to_rows(&records),
            vec![
                row(&HEADER),
                row(&["https://svc/MapServer", "Parks", "Trails", "id-001"]),
                row(&["https://svc/MapServer", "Parks", "Boundaries", "id-001"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_cache_controls_lookup_count() {
        let layers = CatalogDocument::parse_str(PARKS)
            .unwrap()
            .discover_layers()
            .unwrap();

        let cached = FixedResolver::new("id-001");
        let mut pipeline = Pipeline::new(&cached, PipelineOptions::default());
        pipeline.collect(&layers).await.unwrap();
        assert_eq!(pipeline.lookups(), 1);
        assert_eq!(cached.calls.load(Ordering::SeqCst), 1);

        let uncached = FixedResolver::new("id-001");
        let options = PipelineOptions {
            cache_service_ids: false,
        };
        let records = collect_records(&layers, &uncached, options).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(uncached.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolution_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("site.xml");
        let output = dir.path().join("out.csv");
        std::fs::write(&catalog, PARKS).unwrap();

        let err = run(&catalog, &output, &FailingResolver, PipelineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Resolution { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_writes_csv_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("site.xml");
        let output = dir.path().join("out.csv");
        std::fs::write(&catalog, PARKS).unwrap();
        let resolver = FixedResolver::new("id-001");

        let summary = run(&catalog, &output, &resolver, PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                layers: 2,
                services: 1,
                lookups: 1,
                output: output.clone(),
            }
        );
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Layer URL,Layer Name,GXE Display Name,ServiceID\r\n\
             https://svc/MapServer,Parks,Trails,id-001\r\n\
             https://svc/MapServer,Parks,Boundaries,id-001\r\n"
        );
    }
}
