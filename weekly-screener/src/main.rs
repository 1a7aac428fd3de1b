//! Weekly Screener - weekly chart screening for TSE Prime and S&P 500.
//!
//! Scans the market universe in batches, keeps the tickers whose weekly
//! chart matches the chosen strategy, and prints them as a card grid.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use screener_common::config::Config;
use screener_common::logging::init_logging_with_exclusions;
use weekly_screener::screener::{CardRenderer, ScanConfig};
use weekly_screener::universe::Market;
use weekly_screener::ScreenerService;

mod cli;

use cli::{Cli, Commands, ScanArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_and_validate(cli.config.as_deref())?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Weekly Screener v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan(args) => run_scan(config, &args).await,
        Commands::Universe { market, limit } => list_universe(config, market, limit).await,
    }
}

async fn run_scan(mut config: Config, args: &ScanArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate().map_err(screener_common::Error::from)?;

    let scan = ScanConfig::from_config(&config)?;
    let renderer = CardRenderer::from_settings(&config.screener.output)?;
    tracing::info!("{}", scan.summary());

    let service = ScreenerService::new(config);
    let report = service
        .scan(scan, &mut |done: usize, total: usize| {
            tracing::info!(done, total, "Batch {}/{}", done, total);
        })
        .await?;

    println!("{}", renderer.render(&report)?);

    let target = args.output.clone().or_else(|| {
        service
            .config()
            .screener
            .output
            .report_dir
            .as_ref()
            .map(|dir| PathBuf::from(dir).join(&report.id))
    });

    if let Some(path) = target {
        let saved = renderer
            .save_to_file(&report, &path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        tracing::info!(path = %saved.display(), "Report saved");
    }

    Ok(())
}

async fn list_universe(config: Config, market: Option<String>, limit: Option<usize>) -> Result<()> {
    let name = market.unwrap_or_else(|| config.screener.market.clone());
    let market = Market::parse(&name).with_context(|| format!("Unknown market: {}", name))?;

    let service = ScreenerService::new(config);
    let universe = service.universe(market).await;

    for (symbol, display) in universe.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}\t{}", symbol, display);
    }
    tracing::info!(market = %market, count = universe.len(), "Universe listed");

    Ok(())
}
