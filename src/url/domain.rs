use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_harvester::url::extract_host;
///
/// let url = Url::parse("https://SHOP.example.com/en/").unwrap();
/// assert_eq!(extract_host(&url), Some("shop.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs point at the same host and port
pub fn same_host(a: &Url, b: &Url) -> bool {
    extract_host(a).is_some()
        && extract_host(a) == extract_host(b)
        && a.port_or_known_default() == b.port_or_known_default()
}
