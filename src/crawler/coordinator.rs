//! Crawler coordinator - worker pool orchestration
//!
//! This module contains the crawl loop that coordinates:
//! - The one-time robots.txt check
//! - Seeding the frontier with the base URL
//! - A fixed pool of workers draining the frontier
//! - Collecting scraped product records
//! - Cancellation without losing collected records

use crate::catalog::ProductRecord;
use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::parse_page;
use crate::output::CrawlStatistics;
use crate::robots::fetch_robots;
use crate::state::PageState;
use crate::url::{frontier_key, is_product_page, same_host};
use crate::{HarvestError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// Result of a crawl: the scraped batch plus run statistics
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Every product record scraped, in the order workers produced them
    pub products: Vec<ProductRecord>,

    /// Page and product counters for the run
    pub stats: CrawlStatistics,
}

/// Cloneable handle for stopping a running crawl from elsewhere
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    frontier: Arc<Frontier>,
}

impl CrawlHandle {
    /// Stops the crawl
    ///
    /// Workers abandon in-flight fetches; records scraped so far are still
    /// returned by [`Coordinator::run`].
    pub fn cancel(&self) {
        tracing::warn!("Crawl cancelled, stopping workers");
        self.frontier.close();
    }

    /// Returns true once the crawl was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.frontier.is_closed()
    }
}

/// Per-state page counters shared by the workers
#[derive(Debug, Default)]
struct PageCounters {
    parsed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl PageCounters {
    /// Counts a page that reached a terminal state; active states are ignored
    fn record(&self, state: PageState) {
        let counter = match state {
            PageState::Parsed => &self.parsed,
            PageState::Skipped => &self.skipped,
            PageState::Failed => &self.failed,
            PageState::Pending | PageState::InFlight => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> HashMap<PageState, u64> {
        [
            (PageState::Parsed, &self.parsed),
            (PageState::Skipped, &self.skipped),
            (PageState::Failed, &self.failed),
        ]
        .into_iter()
        .map(|(state, counter)| (state, counter.load(Ordering::Relaxed)))
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

/// Moves a URL to its next lifecycle state
fn advance(url: &str, state: &mut PageState, next: PageState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid page transition {} -> {}",
        state,
        next
    );
    tracing::debug!("{}: {} -> {}", url, state, next);
    *state = next;
}

/// State every worker shares
struct WorkerContext {
    fetcher: Fetcher,
    frontier: Arc<Frontier>,
    products: Mutex<Vec<ProductRecord>>,
    counters: PageCounters,
    base_url: Url,
    same_host_only: bool,
    politeness_delay: Duration,
}

impl WorkerContext {
    /// Drains the frontier until it converges or is closed
    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);

        while let Some(url) = self.frontier.next().await {
            tracing::trace!("Worker {} took {}", worker_id, url);
            let mut state = PageState::Pending;
            advance(&url, &mut state, PageState::InFlight);

            let outcome = tokio::select! {
                biased;
                _ = self.frontier.closed() => PageState::Skipped,
                outcome = self.process_url(&url) => outcome,
            };
            advance(&url, &mut state, outcome);
            self.counters.record(state);

            if state == PageState::Parsed {
                tokio::select! {
                    biased;
                    _ = self.frontier.closed() => {}
                    _ = tokio::time::sleep(self.politeness_delay) => {}
                }
            }
            self.frontier.complete();
        }

        tracing::debug!("Worker {} finished", worker_id);
    }

    /// Fetches one URL, harvests it, and queues the links it discovered
    ///
    /// Failed fetches are dropped without taking the politeness delay.
    async fn process_url(&self, url: &str) -> PageState {
        let page_url = match Url::parse(url) {
            Ok(page_url) => page_url,
            Err(e) => {
                tracing::warn!("Skipping unparsable frontier URL {}: {}", url, e);
                return PageState::Failed;
            }
        };

        let Some(body) = self.fetcher.fetch(url).await else {
            return PageState::Failed;
        };

        let parsed = parse_page(&body, &page_url, is_product_page(url));

        if let Some(product) = parsed.product {
            tracing::info!(
                "Scraped product {:?} ({}) from {}",
                product.id,
                product.name.as_deref().unwrap_or("unnamed"),
                url
            );
            self.lock_products().push(product);
        }

        let discovered = parsed.links.len();
        let admitted = self.frontier.extend(
            parsed
                .links
                .into_iter()
                .filter(|link| self.should_follow(link)),
        );
        tracing::debug!(
            "{}: {} product links, {} new, {} pending",
            url,
            discovered,
            admitted,
            self.frontier.pending_len()
        );

        PageState::Parsed
    }

    fn should_follow(&self, link: &str) -> bool {
        if !self.same_host_only {
            return true;
        }
        Url::parse(link)
            .map(|url| same_host(&url, &self.base_url))
            .unwrap_or(false)
    }

    fn lock_products(&self) -> std::sync::MutexGuard<'_, Vec<ProductRecord>> {
        self.products
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    frontier: Arc<Frontier>,
    base_url: Url,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The base URL is invalid or the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let base_url = frontier_key(&config.crawler.base_url)?;
        let fetcher = Fetcher::from_config(&config.fetcher)?;
        let frontier = Arc::new(Frontier::new(config.crawler.max_pages as usize));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            frontier,
            base_url,
        })
    }

    /// Configuration this coordinator was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a handle that can cancel the crawl while [`Coordinator::run`] is running
    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            frontier: Arc::clone(&self.frontier),
        }
    }

    /// Runs the crawl to convergence or cancellation
    ///
    /// This method:
    /// 1. Checks robots.txt once; a disallowed root aborts before any page fetch
    /// 2. Seeds the frontier with the base URL
    /// 3. Spawns the worker pool and waits for every worker to exit
    /// 4. Returns the scraped batch and run statistics
    pub async fn run(self) -> Result<CrawlOutcome> {
        let mut stats = CrawlStatistics::start();
        let crawler = &self.config.crawler;

        let robots = fetch_robots(self.fetcher.client(), &self.base_url).await;
        if !robots.allows_root(self.base_url.path()) {
            tracing::error!("robots.txt disallows {} - aborting to be polite", self.base_url);
            return Err(HarvestError::RobotsDenied {
                url: self.base_url.to_string(),
            });
        }

        let mut politeness_delay = Duration::from_millis(crawler.politeness_delay_ms);
        if let Some(delay) = robots
            .crawl_delay(&self.config.fetcher.user_agent)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        {
            if delay > politeness_delay {
                tracing::info!("Using robots.txt crawl delay of {:?}", delay);
                politeness_delay = delay;
            }
        }

        if self.frontier.push(self.base_url.to_string()).is_err() {
            tracing::warn!("Crawl cancelled before it started");
        }

        let context = Arc::new(WorkerContext {
            fetcher: self.fetcher.clone(),
            frontier: Arc::clone(&self.frontier),
            products: Mutex::new(Vec::new()),
            counters: PageCounters::default(),
            base_url: self.base_url.clone(),
            same_host_only: crawler.same_host_only,
            politeness_delay,
        });

        tracing::info!(
            "Starting crawl of {} with {} workers ({:?} politeness delay)",
            self.base_url,
            crawler.workers,
            politeness_delay
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..crawler.workers.max(1) as usize {
            workers.spawn(Arc::clone(&context).run_worker(worker_id));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        stats.interrupted = self.frontier.is_closed();
        stats.pages_by_state = context.counters.snapshot();
        stats.urls_discovered = self.frontier.seen_len() as u64;

        let products = std::mem::take(&mut *context.lock_products());
        stats.products_scraped = products.len() as u64;
        stats.finished_at = chrono::Utc::now();

        tracing::info!(
            "Crawl finished: {} pages parsed, {} failed, {} products scraped in {}s",
            stats.count(PageState::Parsed),
            stats.count(PageState::Failed),
            products.len(),
            stats.duration().num_seconds()
        );

        Ok(CrawlOutcome { products, stats })
    }
}
