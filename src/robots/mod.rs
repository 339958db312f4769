//! Robots.txt handling module
//!
//! The crawl consults robots.txt exactly once, before any worker starts. A
//! missing or unreachable robots.txt is not a prohibition.

mod parser;

pub use parser::ParsedRobots;

use reqwest::{Client, StatusCode};
use url::Url;

/// Fetches and parses `/robots.txt` from the origin of `base_url`
///
/// Any failure (network error, non-200 status, unreadable body) yields
/// [`ParsedRobots::allow_all`].
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `base_url` - The crawl root; only its origin is used
pub async fn fetch_robots(client: &Client, base_url: &Url) -> ParsedRobots {
    let robots_url = match base_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", base_url, e);
            return ParsedRobots::allow_all();
        }
    };

    tracing::debug!("Fetching {}", robots_url);

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("robots.txt check failed, proceeding cautiously: {}", e);
            return ParsedRobots::allow_all();
        }
    };

    if response.status() != StatusCode::OK {
        tracing::debug!(
            "No usable robots.txt at {} (HTTP {})",
            robots_url,
            response.status().as_u16()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!("Failed to read robots.txt body: {}", e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks whether crawling `base_url` is permitted by its site's robots.txt
///
/// # Returns
///
/// * `true` - robots.txt is absent, unreachable, or has no rule overlapping the root path
/// * `false` - a `Disallow:` rule covers the root path of `base_url` or lies under it
pub async fn is_crawl_allowed(client: &Client, base_url: &Url) -> bool {
    fetch_robots(client, base_url)
        .await
        .allows_root(base_url.path())
}
