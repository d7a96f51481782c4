use layer_catalog::pipeline::{self, PipelineOptions};
use layer_catalog::{Error, HttpResolver, ResolveCause, TransportConfig, HEADER};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_xml(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<LayerCatalog>
  <Site Name="Public">
    <MapServices>
      <MapService ConnectionString="url={base}/arcgis/rest/services/Parks/MapServer/0" DisplayName="Parks">
        <Layers>
          <Layer DisplayName="Trails"/>
          <Layer DisplayName="Boundaries, &quot;official&quot;"/>
        </Layers>
      </MapService>
      <MapService ConnectionString="url={base}/arcgis/rest/services/Empty/MapServer/0" DisplayName="Empty">
        <Layers/>
      </MapService>
      <MapService ConnectionString="url={base}/arcgis/rest/services/Roads/MapServer/0" DisplayName="Roads">
        <Layers>
          <Layer DisplayName="Highways"/>
        </Layers>
      </MapService>
    </MapServices>
  </Site>
</LayerCatalog>"#
    )
}

async fn mount_service(server: &MockServer, service: &str, id: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/arcgis/rest/services/{service}/MapServer/")))
        .and(query_param("f", "pjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentVersion": 11.1,
            "serviceItemId": id,
        })))
        .expect(expected)
        .mount(server)
        .await;
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[tokio::test]
async fn test_catalog_to_csv() {
    let server = MockServer::start().await;
    mount_service(&server, "Parks", "parks-item", 1).await;
    mount_service(&server, "Roads", "roads-item", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("site.xml");
    let output = dir.path().join("layers.csv");
    std::fs::write(&catalog, catalog_xml(&server.uri())).unwrap();

    let resolver = HttpResolver::new(&TransportConfig::default()).unwrap();
    let summary = pipeline::run(&catalog, &output, &resolver, PipelineOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.layers, 3);
    assert_eq!(summary.services, 2);
    assert_eq!(summary.lookups, 2);

    let parks = format!("{}/arcgis/rest/services/Parks/MapServer/0", server.uri());
    let roads = format!("{}/arcgis/rest/services/Roads/MapServer/0", server.uri());
    let rows = read_rows(&output);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], HEADER.map(String::from).to_vec());
    assert_eq!(rows[1], vec![parks.clone(), "Parks".into(), "Trails".into(), "parks-item".into()]);
    assert_eq!(
        rows[2],
        vec![
            parks,
            "Parks".into(),
            "Boundaries, \"official\"".into(),
            "parks-item".into()
        ]
    );
    assert_eq!(rows[3], vec![roads, "Roads".into(), "Highways".into(), "roads-item".into()]);
}

#[tokio::test]
async fn test_without_cache_every_layer_is_looked_up() {
    let server = MockServer::start().await;
    mount_service(&server, "Parks", "parks-item", 2).await;
    mount_service(&server, "Roads", "roads-item", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("site.xml");
    let output = dir.path().join("layers.csv");
    std::fs::write(&catalog, catalog_xml(&server.uri())).unwrap();

    let resolver = HttpResolver::new(&TransportConfig::default()).unwrap();
    let options = PipelineOptions {
        cache_service_ids: false,
    };
    let summary = pipeline::run(&catalog, &output, &resolver, options)
        .await
        .unwrap();

    assert_eq!(summary.lookups, 3);
    assert_eq!(read_rows(&output).len(), 4);
}

#[tokio::test]
async fn test_bad_metadata_aborts_before_export() {
    let server = MockServer::start().await;
    mount_service(&server, "Parks", "parks-item", 1).await;
    Mock::given(method("GET"))
        .and(path("/arcgis/rest/services/Roads/MapServer/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Service unavailable"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("site.xml");
    let output = dir.path().join("layers.csv");
    std::fs::write(&catalog, catalog_xml(&server.uri())).unwrap();

    let resolver = HttpResolver::new(&TransportConfig::default()).unwrap();
    let err = pipeline::run(&catalog, &output, &resolver, PipelineOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::Resolution {
            connection_string,
            cause: ResolveCause::Body(_),
        } => assert!(connection_string.ends_with("/Roads/MapServer/0")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_malformed_catalog_makes_no_requests() {
    let server = MockServer::start().await;
    mount_service(&server, "Parks", "parks-item", 0).await;

    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("site.xml");
    let output = dir.path().join("layers.csv");
    let mut xml = catalog_xml(&server.uri());
    xml.truncate(xml.len() - "</LayerCatalog>".len());
    std::fs::write(&catalog, xml).unwrap();

    let resolver = HttpResolver::new(&TransportConfig::default()).unwrap();
    let err = pipeline::run(&catalog, &output, &resolver, PipelineOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Parse { .. }));
    assert!(!output.exists());
}
