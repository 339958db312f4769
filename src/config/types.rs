use serde::Deserialize;

/// Browser-identifying user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Main configuration structure for Catalog-Harvester
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root URL the crawl is seeded with
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of concurrent workers draining the frontier
    pub workers: u32,

    /// Pause each worker takes after processing a page (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Maximum number of URLs admitted to the frontier (0 = unlimited)
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Only follow links on the base URL's host
    #[serde(rename = "same-host-only")]
    pub same_host_only: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gsmserver.com/en/".to_string(),
            workers: 6,
            politeness_delay_ms: 600,
            max_pages: 0,
            same_host_only: true,
        }
    }
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on every further retry (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// User-Agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the product catalog that scraped records are merged into
    #[serde(rename = "products-path")]
    pub products_path: String,

    /// Path to the raw snapshot of every record scraped in a run
    #[serde(rename = "scraped-path")]
    pub scraped_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            products_path: "products.json".to_string(),
            scraped_path: "data/scraped_products.json".to_string(),
        }
    }
}
