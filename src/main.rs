//! Stock-Crawler main entry point
//!
//! This is the command-line interface for the Stock-Crawler quote scraper.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stock_crawler::config::{load_config_with_hash, Config};
use stock_crawler::{CrawlLogger, Crawler};
use tracing_subscriber::EnvFilter;

/// Stock-Crawler: a scheduled A-share quote scraper
///
/// Without a mode flag the crawler starts its scheduler and crawls at the
/// configured times of day until interrupted.
#[derive(Parser, Debug)]
#[command(name = "stock-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A scheduled A-share quote scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl once, print the result as JSON and exit
    #[arg(long, conflicts_with_all = ["current", "history", "dates", "range"])]
    once: bool,

    /// Print the current snapshot as JSON and exit
    #[arg(long, conflicts_with_all = ["once", "history", "dates", "range"])]
    current: bool,

    /// Print the history snapshot for DATE (YYYY-MM-DD) and exit
    #[arg(long, value_name = "DATE", conflicts_with_all = ["once", "current", "dates", "range"])]
    history: Option<String>,

    /// Print every stored history date and exit
    #[arg(long, conflicts_with_all = ["once", "current", "history", "range"])]
    dates: bool,

    /// Print history snapshots between START and END (inclusive) and exit
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with_all = ["once", "current", "history", "dates"])]
    range: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let logger = Arc::new(CrawlLogger::new(&config.log.file, config.log.recent_capacity));
    if let Some(path) = logger.path() {
        tracing::debug!("Crawl log: {}", path.display());
    }
    let crawler = Crawler::new(&config, logger)?;

    if cli.once {
        handle_once(&crawler).await
    } else if cli.current {
        print_json(&crawler.current_data())
    } else if let Some(date) = &cli.history {
        print_json(&crawler.history_data(date))
    } else if cli.dates {
        print_json(&crawler.history_dates())
    } else if let Some(range) = &cli.range {
        print_json(&crawler.history_range(&range[0], &range[1]))
    } else {
        handle_schedule(&config, &crawler).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stock_crawler=info,warn"),
            1 => EnvFilter::new("stock_crawler=debug,info"),
            2 => EnvFilter::new("stock_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handles --once: a single manual crawl
async fn handle_once(crawler: &Crawler) -> anyhow::Result<()> {
    let result = crawler.manual_crawl().await;
    print_json(&result)?;

    if !result.success() {
        anyhow::bail!(
            "Crawl failed: {}",
            result.error().unwrap_or("unknown error")
        );
    }

    Ok(())
}

/// Handles the default mode: scheduled crawling until Ctrl-C
async fn handle_schedule(config: &Config, crawler: &Crawler) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} at {}",
        crawler.target_url(),
        config.schedule.times.join(", ")
    );

    crawler.start_scheduler();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    crawler.stop_scheduler();

    Ok(())
}
