use crate::{UrlError, UrlResult};
use url::Url;

/// Produces the key a URL is stored under in the crawl frontier
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS, or has no host
/// 3. Remove the query string
/// 4. Remove the fragment
///
/// Two links that differ only in their query string are the same page as far
/// as the crawl is concerned.
///
/// # Examples
///
/// ```
/// use catalog_harvester::url::frontier_key;
///
/// let url = frontier_key("https://shop.example/en/p/42?color=red#reviews").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example/en/p/42");
/// ```
pub fn frontier_key(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
