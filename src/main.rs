//! BBC-Harvest main entry point
//!
//! This is the command-line interface for the BBC-Harvest keyword news crawler.

use anyhow::Context;
use bbc_harvest::config::{load_config_with_hash, Config};
use bbc_harvest::crawler::{Coordinator, RunMode};
use bbc_harvest::output::{print_statistics, resolve_results_path};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// BBC-Harvest: a polite keyword crawler for news articles
///
/// BBC-Harvest searches the site for topical keywords, extracts article text,
/// images and videos, and stores them as plain-text files plus a JSON report.
/// Without `--search` or `--crawl` it downloads the articles listed in a
/// search-results file.
#[derive(Parser, Debug)]
#[command(name = "bbc-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite keyword crawler for news articles", long_about = None)]
struct Cli {
    /// Search-results JSON to download from (defaults: advanced_search_results.json, search_results.json)
    #[arg(value_name = "RESULTS")]
    results: Option<PathBuf>,

    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Search every configured query and save the results
    #[arg(long, conflicts_with_all = ["crawl", "results"])]
    search: bool,

    /// Search each keyword and download its articles right away
    #[arg(long, conflicts_with_all = ["search", "results"])]
    crawl: bool,

    /// Validate config and show what would be done without any requests
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            Config::default()
        }
    };

    let mode = if cli.search {
        RunMode::Search
    } else if cli.crawl {
        RunMode::Crawl
    } else {
        RunMode::Download(cli.results.clone())
    };

    if cli.dry_run {
        return handle_dry_run(&config, &mode);
    }

    handle_run(config, mode).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bbc_harvest=info,warn"),
            1 => EnvFilter::new("bbc_harvest=debug,info"),
            2 => EnvFilter::new("bbc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be done
fn handle_dry_run(config: &Config, mode: &RunMode) -> anyhow::Result<()> {
    println!("=== BBC-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Search URL: {}", config.site.search_url);

    println!("\nPoliteness:");
    println!(
        "  Request delay: {}-{}s",
        config.politeness.request_delay_min, config.politeness.request_delay_max
    );
    println!(
        "  Batch: {} articles, {}s pause",
        config.politeness.batch_size, config.politeness.batch_pause
    );
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  HTTP: {} attempts, backoff factor {}",
        config.http.max_attempts, config.http.backoff_factor
    );

    println!("\nOutput:");
    println!("  Articles: {}", config.output.articles_dir);
    println!("  Images: {}", config.output.images_dir);
    println!("  Videos: {}", config.output.videos_dir);
    println!("  Report: {}", config.output.report_path);
    match &config.dedup.database_path {
        Some(path) => println!("  Dedup database: {}", path),
        None => println!("  Dedup: in memory"),
    }

    match mode {
        RunMode::Search => {
            println!("\nQueries ({}):", config.search.queries.len());
            for query in &config.search.queries {
                println!(
                    "  - {} ({} to {})",
                    query.keyword,
                    query.start_date.as_deref().unwrap_or("any"),
                    query.end_date.as_deref().unwrap_or("any")
                );
            }
            println!("\n✓ Would save results to {}", config.output.search_results_path);
        }
        RunMode::Crawl => {
            println!("\nKeywords ({}):", config.search.keywords.len());
            for keyword in &config.search.keywords {
                println!("  - {}", keyword);
            }
            println!(
                "\n✓ Would search up to {} pages per keyword",
                config.search.max_pages
            );
        }
        RunMode::Download(path) => {
            let path = resolve_results_path(path.as_deref())?;
            println!(
                "\n✓ Would download up to {} articles from {}",
                config.politeness.target_article_count,
                path.display()
            );
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main run, stopping cleanly on Ctrl-C
async fn handle_run(config: Config, mode: RunMode) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::new(config).context("Failed to initialize harvester")?;

    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current article and stopping");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    match coordinator.run(mode).await {
        Ok(()) => {
            tracing::info!("Run completed");
            print_statistics(coordinator.stats());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
