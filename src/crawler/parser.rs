//! HTML parser for product pages and link discovery
//!
//! Both extraction modes run over one parsed document. Nothing in here can
//! fail: a missing element leaves the corresponding field empty.

use crate::catalog::ProductRecord;
use crate::url::{frontier_key, is_product_link};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// First numeric token of a price label, e.g. `1299,90`
static PRICE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[.,]?\d*").unwrap());

/// `/p/<digits>` product path
static PRODUCT_PATH_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/p/(\d+)").unwrap());

/// Any run of five or more digits
static LONG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{5,})").unwrap());

/// Image file extensions kept in a product's gallery
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Product-ish links found on the page, as frontier keys, in document order
    pub links: Vec<String>,

    /// The product record, when extraction was requested
    pub product: Option<ProductRecord>,
}

/// Parses a fetched page once and runs the requested extractions
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the content was fetched from
/// * `extract_product` - Whether to build a product record from the page
pub fn parse_page(html: &str, page_url: &Url, extract_product: bool) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        links: extract_links(&document, page_url),
        product: extract_product.then(|| extract_product_record(&document, page_url)),
    }
}

/// Collects the product-ish links on a page
///
/// Every `<a href>` is resolved against the page URL; links classified by
/// [`is_product_link`] are kept with their query string removed. Duplicates
/// are dropped, first occurrence wins.
///
/// # Example
///
/// ```
/// use catalog_harvester::crawler::discover_links;
/// use url::Url;
///
/// let html = r#"<a href="/en/p/42?ref=menu">Box</a><a href="/en/about">About</a>"#;
/// let base = Url::parse("https://shop.example/en/").unwrap();
/// assert_eq!(discover_links(html, &base), vec!["https://shop.example/en/p/42"]);
/// ```
pub fn discover_links(html: &str, page_url: &Url) -> Vec<String> {
    extract_links(&Html::parse_document(html), page_url)
}

/// Builds a product record from a product page
///
/// # Extraction Rules
///
/// | Field | Source |
/// |-------|--------|
/// | `name` | text of the first `h1` |
/// | `price` | first number in `.price`, else in the first `strong`; `,` read as decimal point |
/// | `images` | every `img` `src` (or lazy `data-src`) ending in jpg/jpeg/png/webp |
/// | `description` | text of `.description` or `#description`, else empty |
/// | `id` | `/p/<digits>` in the URL, else the first run of 5+ digits |
pub fn parse_product_page(html: &str, page_url: &Url) -> ProductRecord {
    extract_product_record(&Html::parse_document(html), page_url)
}

/// Extracts the numeric product id from a URL
///
/// Tries `/p/<digits>` first, then the first run of five or more digits.
/// Zero is not a valid id.
pub fn product_id_from_url(url: &str) -> Option<u64> {
    PRODUCT_PATH_ID
        .captures(url)
        .or_else(|| LONG_NUMBER.captures(url))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .filter(|id| *id != 0)
}

/// Extracts the first price-like number from a label
pub fn parse_price(text: &str) -> Option<f64> {
    PRICE_NUMBER
        .find(text)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
}

fn extract_product_record(document: &Html, page_url: &Url) -> ProductRecord {
    let url = page_url.as_str();

    ProductRecord {
        id: product_id_from_url(url),
        url: url.to_string(),
        name: extract_name(document),
        price: extract_price(document),
        images: extract_images(document, page_url),
        description: extract_description(document),
        ..ProductRecord::default()
    }
}

fn extract_name(document: &Html) -> Option<String> {
    let h1 = select_first(document, "h1")?;
    Some(joined_text(h1, "")).filter(|s| !s.is_empty())
}

fn extract_price(document: &Html) -> Option<f64> {
    let element = select_first(document, ".price").or_else(|| select_first(document, "strong"))?;
    parse_price(&joined_text(element, " "))
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .filter(|src| !src.trim().is_empty())
                .or_else(|| attrs.attr("data-src"))
        })
        .filter_map(|src| page_url.join(src.trim()).ok())
        .map(|url| url.to_string())
        .filter(|url| {
            let lower = url.to_lowercase();
            IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .collect()
}

fn extract_description(document: &Html) -> String {
    select_first(document, ".description")
        .or_else(|| select_first(document, "#description"))
        .map(|element| joined_text(element, " "))
        .unwrap_or_default()
}

/// Extracts all product-ish links from the HTML document
fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, page_url) else {
            continue;
        };
        let Ok(key) = frontier_key(absolute.as_str()) else {
            continue;
        };
        if is_product_link(&key) && seen.insert(key.to_string()) {
            links.push(key.to_string());
        }
    }

    links
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    base_url.join(href).ok()
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Trimmed, non-empty text nodes of an element joined with `separator`
fn joined_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
