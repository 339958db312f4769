//! Catalog-Harvester main entry point
//!
//! This is the command-line interface for the Catalog-Harvester product crawler.

use anyhow::Context;
use catalog_harvester::catalog::{load_batch, merge_into_file};
use catalog_harvester::config::{load_config_with_hash, validate, Config};
use catalog_harvester::crawler::{harvest, Coordinator};
use catalog_harvester::output::print_statistics;
use catalog_harvester::HarvestError;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Harvester: a polite storefront product crawler
///
/// Catalog-Harvester crawls a storefront for product pages while respecting
/// robots.txt and a politeness delay, saves every scraped product, and merges
/// the scraped products into a JSON product catalog.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A polite storefront product crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "replay")]
    dry_run: bool,

    /// Merge a previously saved scrape batch into the catalog without crawling
    #[arg(long, value_name = "BATCH", conflicts_with = "dry_run")]
    replay: Option<PathBuf>,

    /// Override the crawl root URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(batch) = &cli.replay {
        handle_replay(&config, batch)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvester=info,warn"),
            1 => EnvFilter::new("catalog_harvester=debug,info"),
            2 => EnvFilter::new("catalog_harvester=trace,debug"),
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

/// Loads the config file (or the defaults) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(base_url) = &cli.base_url {
        config.crawler.base_url = base_url.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_ms
    );
    if config.crawler.max_pages > 0 {
        println!("  Max pages: {}", config.crawler.max_pages);
    } else {
        println!("  Max pages: unlimited");
    }
    println!("  Same host only: {}", config.crawler.same_host_only);

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!("  Initial backoff: {}ms", config.fetcher.initial_backoff_ms);
    println!("  User agent: {}", config.fetcher.user_agent);

    println!("\nOutput:");
    println!("  Catalog: {}", config.output.products_path);
    println!("  Scrape batch: {}", config.output.scraped_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --replay mode: merges a saved batch into the catalog
fn handle_replay(config: &Config, batch_path: &Path) -> anyhow::Result<()> {
    let batch = load_batch(batch_path)
        .with_context(|| format!("Failed to read scrape batch {}", batch_path.display()))?;
    tracing::info!(
        "Replaying {} products from {}",
        batch.len(),
        batch_path.display()
    );

    let summary = merge_into_file(Path::new(&config.output.products_path), &batch)?;
    println!(
        "✓ Merged {} products into {}: {} added, {} updated, {} unchanged, {} without id",
        batch.len(),
        config.output.products_path,
        summary.added,
        summary.updated,
        summary.unchanged,
        summary.skipped
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with {} workers",
        config.crawler.base_url,
        config.crawler.workers
    );

    let coordinator = Coordinator::new(config)?;
    let handle = coordinator.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    match harvest(coordinator).await {
        Ok(stats) => {
            print_statistics(&stats);
            tracing::info!("Harvest completed successfully");
            Ok(())
        }
        Err(e @ HarvestError::RobotsDenied { .. }) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e).context("Harvest failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_cli_override_fixes_invalid_file_value() {
        let file = config_file("[crawler]\nworkers = 0\n");
        let path = file.path().to_str().unwrap();

        let cli = Cli::parse_from(["catalog-harvester", path, "--workers", "4"]);
        let config = load_effective_config(&cli).unwrap();
        assert_eq!(config.crawler.workers, 4);

        let cli = Cli::parse_from(["catalog-harvester", path]);
        assert!(load_effective_config(&cli).is_err());
    }

    #[test]
    fn test_cli_base_url_override_is_validated() {
        let cli = Cli::parse_from(["catalog-harvester", "--base-url", "ftp://shop.example/"]);
        assert!(load_effective_config(&cli).is_err());

        let cli = Cli::parse_from(["catalog-harvester", "--base-url", "https://shop.example/en/"]);
        let config = load_effective_config(&cli).unwrap();
        assert_eq!(config.crawler.base_url, "https://shop.example/en/");
    }
}
