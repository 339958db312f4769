//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building an HTTP client that presents itself as a regular browser
//! - GET requests with a per-request timeout
//! - Retry with exponential backoff on transient failures
//! - Classification of each attempt's outcome

use crate::config::FetcherConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// HTTP 200 with a readable body
    Document(String),

    /// HTTP 403 or 429: the site is blocking or rate limiting us
    Blocked { status_code: u16 },

    /// Any other non-200 status
    HttpStatus { status_code: u16 },

    /// Transport failure (timeout, connection refused, unreadable body, ...)
    Network { error: String },
}

/// Retry schedule for a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based) before retrying
    ///
    /// The delay doubles with every retry and has no jitter:
    /// `initial, 2 * initial, 4 * initial, ...`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client sends a browser User-Agent plus the Accept headers a browser
/// would send, so that trivial bot filters let it through.
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::config::FetcherConfig;
/// use catalog_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher shared by all crawl workers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from an existing client and retry policy
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds the client and retry policy from configuration
    pub fn from_config(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, RetryPolicy::from(config)))
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The retry policy applied by [`Fetcher::fetch`]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return the body |
    /// | HTTP 403 / 429 | Retry after backoff |
    /// | Other status | Retry after backoff |
    /// | Network error / timeout | Retry after backoff |
    ///
    /// After the last failed attempt no further delay is taken.
    ///
    /// # Returns
    ///
    /// * `Some(String)` - The page body
    /// * `None` - Every attempt failed; the caller should skip the URL
    pub async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(url).await {
                FetchOutcome::Document(body) => return Some(body),
                FetchOutcome::Blocked { status_code } => {
                    tracing::warn!(
                        "Blocked or rate limited ({}) for {} (attempt {})",
                        status_code,
                        url,
                        attempt
                    );
                }
                FetchOutcome::HttpStatus { status_code } => {
                    tracing::debug!("Non-200 ({}) for {} (attempt {})", status_code, url, attempt);
                }
                FetchOutcome::Network { error } => {
                    tracing::debug!("Fetch error for {} (attempt {}): {}", url, attempt, error);
                }
            }

            if attempt < self.policy.max_attempts {
                let delay = self.policy.backoff_after(attempt);
                tracing::trace!("Backing off {:?} before retrying {}", delay, url);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!(
            "Giving up on {} after {} attempts",
            url,
            self.policy.max_attempts
        );
        None
    }

    /// Performs exactly one GET request and classifies the result
    pub async fn attempt(&self, url: &str) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return FetchOutcome::Network { error };
            }
        };

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::Blocked {
                status_code: status.as_u16(),
            };
        }
        if status != StatusCode::OK {
            return FetchOutcome::HttpStatus {
                status_code: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Document(body),
            Err(e) => FetchOutcome::Network {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_after(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_backoff: Duration::from_millis(10),
        };
        assert_eq!(policy.backoff_after(0), Duration::from_millis(10));
        assert_eq!(policy.backoff_after(17), policy.backoff_after(40));
    }

    #[test]
    fn test_policy_from_config() {
        let config = FetcherConfig {
            max_attempts: 5,
            initial_backoff_ms: 250,
            ..FetcherConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_after(2), Duration::from_millis(500));
    }

    #[test]
    fn test_default_policy_matches_default_config() {
        assert_eq!(RetryPolicy::from(&FetcherConfig::default()), RetryPolicy::default());
    }

    #[tokio::test]
    async fn test_attempt_classifies_statuses() {
        use wiremock::matchers::path;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        for (page, status) in [("/ok", 200), ("/forbidden", 403), ("/busy", 429), ("/gone", 404)] {
            Mock::given(path(page))
                .respond_with(ResponseTemplate::new(status).set_body_string("<h1>x</h1>"))
                .mount(&server)
                .await;
        }

        let fetcher = Fetcher::from_config(&FetcherConfig::default()).unwrap();
        let url = |page: &str| format!("{}{}", server.uri(), page);

        assert!(matches!(
            fetcher.attempt(&url("/ok")).await,
            FetchOutcome::Document(body) if body == "<h1>x</h1>"
        ));
        assert!(matches!(
            fetcher.attempt(&url("/forbidden")).await,
            FetchOutcome::Blocked { status_code: 403 }
        ));
        assert!(matches!(
            fetcher.attempt(&url("/busy")).await,
            FetchOutcome::Blocked { status_code: 429 }
        ));
        assert!(matches!(
            fetcher.attempt(&url("/gone")).await,
            FetchOutcome::HttpStatus { status_code: 404 }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_gives_none() {
        let fetcher = Fetcher::new(
            build_http_client(&FetcherConfig::default()).unwrap(),
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
            },
        );
        // Port 9 on localhost (discard) is not expected to serve HTTP
        assert!(fetcher.fetch("http://127.0.0.1:9/p/1").await.is_none());
    }
}
