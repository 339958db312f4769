//! URL handling module for Catalog-Harvester
//!
//! This module provides frontier keys (the form a URL takes in the seen-set),
//! host extraction, and the product-URL heuristics the crawler uses to decide
//! which links to follow and which pages to extract products from.

mod domain;
mod normalize;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use normalize::frontier_key;

/// A path segment that starts with at least three digits
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{3,}").unwrap());

/// A path segment that starts with at least five digits
static PRODUCT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{5,}").unwrap());

/// Path markers used by the storefront for product detail pages
const PRODUCT_MARKERS: &[&str] = &["/p/", "/product/"];

/// Returns true if a discovered link looks like it leads toward products
///
/// A link qualifies when its path contains `/p/` or `/product/`, or a segment
/// starting with three or more digits. Only qualifying links are enqueued.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvester::url::is_product_link;
///
/// assert!(is_product_link(&Url::parse("https://shop.example/en/p/42-cable").unwrap()));
/// assert!(is_product_link(&Url::parse("https://shop.example/en/catalog/123").unwrap()));
/// assert!(!is_product_link(&Url::parse("https://shop.example/en/about").unwrap()));
/// ```
pub fn is_product_link(url: &Url) -> bool {
    let path = url.path();
    PRODUCT_MARKERS.iter().any(|marker| path.contains(marker)) || NUMERIC_SEGMENT.is_match(path)
}

/// Returns true if a fetched URL should have a product record extracted
///
/// This is stricter than [`is_product_link`]: the URL must contain `/p/` or a
/// segment starting with five or more digits.
pub fn is_product_page(url: &str) -> bool {
    url.contains("/p/") || PRODUCT_NUMBER.is_match(url)
}
