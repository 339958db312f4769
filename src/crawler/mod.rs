//! Crawler module for product discovery and extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - HTML parsing, product link discovery and product extraction
//! - The deduplicated frontier shared by the workers
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{Coordinator, CrawlHandle, CrawlOutcome};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, RetryPolicy};
pub use frontier::{Frontier, PushRejection};
pub use parser::{
    discover_links, parse_page, parse_price, parse_product_page, product_id_from_url, ParsedPage,
};

use crate::catalog::{merge_into_file, save_batch};
use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::Result;
use std::path::Path;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Check robots.txt for the base URL
/// 2. Crawl the storefront with the configured worker pool
/// 3. Write every scraped record to the raw batch file
/// 4. Merge the batch into the product catalog
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Harvest completed (possibly with failed pages)
/// * `Err(HarvestError)` - robots.txt denied the crawl, or a file could not be written
pub async fn run_crawl(config: Config) -> Result<CrawlStatistics> {
    harvest(Coordinator::new(config)?).await
}

/// Runs an already constructed coordinator, then persists and merges its batch
///
/// Use this instead of [`run_crawl`] when the crawl must be cancellable: take a
/// [`CrawlHandle`] from the coordinator first. A cancelled crawl still writes
/// and merges whatever it collected.
pub async fn harvest(coordinator: Coordinator) -> Result<CrawlStatistics> {
    let output = coordinator.config().output.clone();
    let CrawlOutcome {
        products,
        mut stats,
    } = coordinator.run().await?;

    if stats.interrupted {
        tracing::warn!(
            "Crawl interrupted, saving {} products collected so far",
            products.len()
        );
    }

    save_batch(Path::new(&output.scraped_path), &products)?;
    tracing::info!(
        "Saved {} scraped products to {}",
        products.len(),
        output.scraped_path
    );

    stats.merge = Some(merge_into_file(Path::new(&output.products_path), &products)?);
    stats.finished_at = chrono::Utc::now();

    Ok(stats)
}
