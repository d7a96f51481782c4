use chrono::NaiveDateTime;
use clap::Parser;
use layer_catalog::{PipelineOptions, TransportConfig};
use std::path::PathBuf;

/// Prefix of generated output file names.
pub const OUTPUT_PREFIX: &str = "LayerCatalogInfo_";

/// Command-line arguments for `layer-catalog`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "layer-catalog",
    version,
    about = "List every layer in a Geocortex Layer Catalog site with its service item id, as CSV"
)]
pub struct Args {
    /// Layer Catalog site XML file
    #[arg(env = "LAYER_CATALOG_INPUT")]
    pub catalog: PathBuf,

    /// Output CSV file. Overrides --output-dir.
    #[arg(short, long, env = "LAYER_CATALOG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Directory for the generated LayerCatalogInfo_<timestamp>.csv
    #[arg(long, default_value = ".", env = "LAYER_CATALOG_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// JSON file with transport settings (headers, proxy, verify_tls, timeout_secs)
    #[arg(long, env = "LAYER_CATALOG_TRANSPORT")]
    pub transport_config: Option<PathBuf>,

    /// Proxy for all metadata requests
    #[arg(long, env = "LAYER_CATALOG_PROXY")]
    pub proxy: Option<String>,

    /// Extra request header. Repeat for several.
    /// Example: --header "X-Api-Key: abc"
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Skip TLS certificate verification
    #[arg(long, default_value_t = false)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", env = "LAYER_CATALOG_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Query the service once per layer instead of once per service
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Only log warnings and errors; no summary
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log each metadata request
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Args {
    /// Transport settings: file (or defaults), then command-line overrides.
    pub fn transport_config(&self) -> layer_catalog::Result<TransportConfig> {
        let mut config = match &self.transport_config {
            Some(path) => TransportConfig::from_json_file(path)?,
            None => TransportConfig::default(),
        };
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if self.insecure {
            config.verify_tls = false;
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        for (name, value) in &self.headers {
            config.set_header(name, value);
        }
        Ok(config)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            cache_service_ids: !self.no_cache,
        }
    }

    /// Where the CSV goes: `--output`, or a timestamped file in `--output-dir`.
    pub fn output_path(&self, now: NaiveDateTime) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self
                .output_dir
                .join(format!("{OUTPUT_PREFIX}{}.csv", now.format("%Y%m%d_%H%M%S"))),
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
