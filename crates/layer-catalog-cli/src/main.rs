//! `layer-catalog <CATALOG>`: export every layer of a Layer Catalog site,
//! with its service item id, to CSV.

mod args;
mod output;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use layer_catalog::{pipeline, HttpResolver};
use output::Styled;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    let s = if args.json {
        Styled::plain()
    } else {
        Styled::new()
    };
    match run(&args, &s).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if args.json {
                output::print_json(&output::failure_json(&e));
            } else {
                output::print_failure(&s, &e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, s: &Styled) -> Result<()> {
    let start = Instant::now();
    info!("beginning processing (layer-catalog v{})", env!("CARGO_PKG_VERSION"));

    let transport = args
        .transport_config()
        .context("failed to load transport settings")?;
    let resolver = HttpResolver::new(&transport)?;
    let output_path = args.output_path(chrono::Local::now().naive_local());

    let summary = pipeline::run(
        &args.catalog,
        &output_path,
        &resolver,
        args.pipeline_options(),
    )
    .await
    .with_context(|| format!("failed to process {}", args.catalog.display()))?;

    info!("finished processing");

    if args.json {
        output::print_json(&output::summary_json(&summary, start.elapsed())?);
    } else if !args.quiet {
        output::print_summary(s, &summary, start.elapsed());
    }

    Ok(())
}
