use anyhow::{Context, Result};
use clap::Parser;
use review_scout::cli::Cli;
use review_scout::pipeline::{self, RunSummary};
use review_scout::scrapers::BrowserSession;
use review_scout::{ReviewSink, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file may supply RUST_LOG and any of the CLI settings
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Cli::parse()
        .into_settings()
        .context("Invalid configuration")?;

    info!("Review Scout - {}", settings.place_url);
    info!(
        "Mode: {:?}, sort: {}, iterations: {}, output: {} ({:?})",
        settings.mode,
        settings.sort.label(),
        settings.scroll_iterations,
        settings.output_path.display(),
        settings.format
    );

    let output = settings.output_path.clone();
    let (summary, total) = tokio::task::spawn_blocking(move || collect(&settings))
        .await
        .context("Scrape task panicked")??;

    if summary.out_of_range > 0 {
        warn!("{} reviews have a rating outside 1-5", summary.out_of_range);
    }
    println!("Saved {} reviews to {}", total, output.display());

    Ok(())
}

/// Run one browser session, always closing the output so partial results stay
/// well-formed.
fn collect(settings: &Settings) -> Result<(RunSummary, usize)> {
    let mut sink = ReviewSink::open(&settings.output_path, settings.format)
        .with_context(|| format!("Failed to create {}", settings.output_path.display()))?;

    let outcome = BrowserSession::launch(settings)
        .and_then(|mut session| Ok(pipeline::run(&mut session, settings, &mut sink)?));

    let total = sink.close().context("Failed to finalize output")?;
    let summary = outcome?;
    Ok((summary, total))
}
