//! Hotel-Sweep main entry point
//!
//! This is the command-line interface for the Hotel-Sweep crawler.

use anyhow::Context;
use clap::Parser;
use hotel_sweep::browser::HttpLauncher;
use hotel_sweep::cache::{RequestInterceptor, ResponseCache};
use hotel_sweep::config::{load_config_with_hash, CrawlTarget, SessionInput};
use hotel_sweep::crawler::{seed_queue, seed_requests, CrawlContext, CrawlDriver};
use hotel_sweep::state::{CrawlProgress, RequestState, PROGRESS_KEY};
use hotel_sweep::storage::{open_storage, Dataset, KeyValueStore, RequestQueue, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Key under which the hash of the last used configuration is kept
const CONFIG_HASH_KEY: &str = "CONFIG_HASH";

/// Hotel-Sweep: a session-aware hotel listing crawler
///
/// Hotel-Sweep searches a hotel listing site (or starts from explicit URLs),
/// converges the requested filters, paginates the results and extracts hotel
/// records. Pages served through a bad proxy session are detected and
/// retried through a fresh one.
#[derive(Parser, Debug)]
#[command(name = "hotel-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A session-aware hotel listing crawler", long_about = None)]
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

    /// Start a fresh crawl, discarding the queue, dataset and saved progress
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the initial requests without crawling
    #[arg(long, conflicts_with = "export")]
    dry_run: bool,

    /// Write the dataset as a JSON array to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with = "dry_run")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, input, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let database_path = Path::new(&config.output.database_path);

    if cli.dry_run {
        handle_dry_run(&input, database_path);
    } else if let Some(path) = &cli.export {
        handle_export(database_path, path)?;
    } else {
        handle_crawl(input, database_path, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hotel_sweep=info,warn"),
            1 => EnvFilter::new("hotel_sweep=debug,info"),
            2 => EnvFilter::new("hotel_sweep=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved input and seed requests
fn handle_dry_run(input: &SessionInput, database_path: &Path) {
    println!("=== Hotel-Sweep Dry Run ===\n");

    match &input.target {
        CrawlTarget::Search { query, dest_type } => {
            println!("Search: '{}' ({})", query, dest_type);
        }
        CrawlTarget::StartUrls(urls) => println!("Start URLs: {}", urls.len()),
    }
    println!("  Currency: {}", input.currency);
    println!("  Sort by: {}", input.sort_by);
    println!("  Minimum score: {}", input.min_score);
    if let Some(property_type) = &input.property_type {
        println!("  Property type: {}", property_type);
    }
    if let Some(band) = input.min_max_price {
        println!("  Price band: {}", band);
    }
    println!("  Generic filters: {}", input.use_filters);
    println!("  Simple mode: {}", input.simple);

    println!("\nCrawler:");
    println!("  Workers: {}", input.max_concurrency);
    println!("  Retries per request: {}", input.max_request_retries);
    println!("  Validate proxies: {}", input.test_proxy);
    println!("  Proxy: {}", input.proxy.url);
    println!("  Database: {}", database_path.display());

    let requests = seed_requests(input);
    println!("\nInitial requests ({}):", requests.len());
    for request in &requests {
        println!("  [{}] {}", request.label, request.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --export mode: writes every dataset record to `path`
fn handle_export(database_path: &Path, path: &Path) -> anyhow::Result<()> {
    let storage = open_storage(database_path)?;
    let records = storage.records()?;

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✓ Exported {} records to: {}", records.len(), path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    input: SessionInput,
    database_path: &Path,
    config_hash: &str,
    fresh: bool,
) -> anyhow::Result<()> {
    let mut storage = open_storage(database_path)?;

    if fresh {
        tracing::info!("Starting fresh crawl (discarding previous state)");
        storage.clear()?;
    } else {
        check_config_hash(&storage, config_hash)?;
    }
    storage.set_value(CONFIG_HASH_KEY, config_hash.as_bytes(), "text/plain")?;

    let added = seed_queue(&mut storage, &input)?;
    tracing::info!(
        "Queued {} initial requests ({} pending)",
        added,
        storage.count_by_state(RequestState::Pending)?
    );

    let progress = load_progress(&storage)?;
    let cache = Arc::new(ResponseCache::new(input.cache_responses));
    let launcher = HttpLauncher::new(Some(input.proxy.url.clone()), RequestInterceptor::new(cache.clone()));

    let ctx = CrawlContext::new(Arc::new(input), Arc::new(Mutex::new(storage)))
        .with_progress(progress);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages...");
            signal.cancel();
        }
    });

    let summary = CrawlDriver::new(ctx, Arc::new(launcher), shutdown)
        .run()
        .await
        .context("Crawl failed")?;

    let purged = cache.purge_expired();
    tracing::debug!(
        "Response cache holds {} live entries ({} expired dropped)",
        cache.len(),
        purged
    );

    if summary.cancelled {
        tracing::info!("Crawl interrupted; run again to resume");
    } else {
        tracing::info!("Crawl completed successfully");
    }
    println!(
        "Handled: {}, failed: {}, records: {}",
        summary.handled, summary.failed, summary.records
    );
    Ok(())
}

/// Warns when the queue on disk was built from a different configuration
fn check_config_hash(storage: &SqliteStorage, config_hash: &str) -> anyhow::Result<()> {
    if let Some(previous) = storage.get_value(CONFIG_HASH_KEY)? {
        if previous != config_hash.as_bytes() {
            tracing::warn!(
                "Configuration changed since the last run; use --fresh to discard the old queue"
            );
        }
    }
    Ok(())
}

fn load_progress(storage: &SqliteStorage) -> anyhow::Result<CrawlProgress> {
    match storage.get_value(PROGRESS_KEY)? {
        Some(bytes) => {
            let progress = CrawlProgress::from_json(&bytes).context("Corrupt saved progress")?;
            tracing::info!("Resuming with {} items already emitted", progress.len());
            Ok(progress)
        }
        None => Ok(CrawlProgress::new()),
    }
}
