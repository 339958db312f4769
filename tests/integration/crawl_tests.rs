//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock storefronts and test
//! the full harvest cycle end-to-end.

use catalog_harvester::config::{Config, CrawlerConfig, FetcherConfig, OutputConfig};
use catalog_harvester::crawler::{harvest, run_crawl, Coordinator};
use catalog_harvester::robots::is_crawl_allowed;
use catalog_harvester::state::PageState;
use catalog_harvester::HarvestError;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `{server}/en/` and writing into `dir`
fn create_test_config(server_uri: &str, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: format!("{}/en/", server_uri),
            workers: 4,
            politeness_delay_ms: 10, // Very short for testing
            max_pages: 0,
            same_host_only: true,
        },
        fetcher: FetcherConfig {
            timeout_secs: 5,
            max_attempts: 3,
            initial_backoff_ms: 20,
            ..FetcherConfig::default()
        },
        output: OutputConfig {
            products_path: dir.join("products.json").display().to_string(),
            scraped_path: dir.join("data/scraped_products.json").display().to_string(),
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_robots_disallow_aborts_before_any_fetch() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /en\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/en/", r#"<a href="/en/p/10001">A</a>"#, 0).await;
    mount_page(&mock_server, "/en/p/10001", "<h1>A</h1>", 0).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let result = run_crawl(config).await;

    assert!(matches!(result, Err(HarvestError::RobotsDenied { .. })));
    assert!(!dir.path().join("products.json").exists());
    assert!(!dir.path().join("data/scraped_products.json").exists());
}

#[tokio::test]
async fn test_disallowed_path_under_root_aborts_crawl() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /en/cart\n"),
        )
        .mount(&mock_server)
        .await;

    let client = reqwest::Client::new();
    let en = url::Url::parse(&format!("{}/en/", mock_server.uri())).unwrap();
    let ru = url::Url::parse(&format!("{}/ru/", mock_server.uri())).unwrap();

    assert!(!is_crawl_allowed(&client, &en).await);
    assert!(is_crawl_allowed(&client, &ru).await);
}

#[tokio::test]
async fn test_missing_robots_allows_crawl() {
    let mock_server = MockServer::start().await;
    let base = url::Url::parse(&format!("{}/en/", mock_server.uri())).unwrap();

    assert!(is_crawl_allowed(&reqwest::Client::new(), &base).await);
}

#[tokio::test]
async fn test_each_url_fetched_at_most_once() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /cart\n"))
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/en/",
        r#"
        <a href="/en/p/10001">A</a>
        <a href="/en/p/10001?ref=menu">A again</a>
        <a href="/en/p/10002#reviews">B</a>
        <a href="/en/catalog/555">Phones</a>
        <a href="/en/about">About</a>
        "#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/catalog/555",
        r#"<a href="/en/p/10001">A</a><a href="/en/p/10003">C</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/p/10001",
        r#"<h1>A</h1><a href="/en/p/10002">B</a><a href="/en/p/10003">C</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/p/10002",
        r#"<h1>B</h1><a href="/en/p/10001">A</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/p/10003", "<h1>C</h1>", 1).await;
    mount_page(&mock_server, "/en/about", "<h1>About</h1>", 0).await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let stats = run_crawl(config).await.unwrap();

    assert_eq!(stats.count(PageState::Parsed), 5);
    assert_eq!(stats.count(PageState::Failed), 0);
    assert_eq!(stats.urls_discovered, 5);
    assert_eq!(stats.products_scraped, 3);
    assert!(!stats.interrupted);
    // Mock expectations are verified when the server drops
}

#[tokio::test]
async fn test_rate_limited_page_retried_with_backoff() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/en/", r#"<a href="/en/p/20001">Busy</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/en/p/20001"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let initial_backoff = Duration::from_millis(config.fetcher.initial_backoff_ms);

    let start = Instant::now();
    let stats = run_crawl(config).await.unwrap();
    let elapsed = start.elapsed();

    // 20ms after the first attempt, 40ms after the second, none after the last
    assert!(elapsed >= initial_backoff * 3);
    assert_eq!(stats.count(PageState::Failed), 1);
    assert_eq!(stats.products_scraped, 0);
}

#[tokio::test]
async fn test_full_harvest_writes_batch_and_merges_catalog() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let products_path = dir.path().join("products.json");
    let scraped_path = dir.path().join("data/scraped_products.json");

    std::fs::write(
        &products_path,
        r#"[
  {"id": 99, "url": "https://shop.example/p/99", "name": "Old", "price": 5.0, "images": [], "description": "kept"},
  {"id": 10001, "url": "", "name": "Existing name", "price": null, "images": [], "description": "", "stock": 7}
]"#,
    )
    .unwrap();

    mount_page(
        &mock_server,
        "/en/",
        r#"<a href="/en/p/10001-phone">Phone</a><a href="/en/p/10002">Cable</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/p/10001-phone",
        r#"
        <h1>Scraped phone</h1>
        <span class="price">12,50 $</span>
        <img src="/img/phone.JPG"><img src="/img/spinner.gif">
        <div class="description">Great phone</div>
        "#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/p/10002",
        r#"<h1>Cable</h1><strong>3.99</strong>"#,
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let stats = run_crawl(config).await.unwrap();

    let merge = stats.merge.expect("merge summary");
    assert_eq!(merge.added, 1);
    assert_eq!(merge.updated, 1);

    let scraped = read_json(&scraped_path);
    assert_eq!(scraped.as_array().unwrap().len(), 2);

    let catalog = read_json(&products_path);
    let entries = catalog.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0]["id"], 99);
    assert_eq!(entries[0]["description"], "kept");

    let phone = &entries[1];
    assert_eq!(phone["id"], 10001);
    assert_eq!(phone["name"], "Existing name");
    assert_eq!(phone["price"], 12.5);
    assert_eq!(phone["description"], "Great phone");
    assert_eq!(phone["stock"], 7);
    assert_eq!(
        phone["url"],
        format!("{}/en/p/10001-phone", mock_server.uri())
    );
    assert_eq!(
        phone["images"],
        serde_json::json!([format!("{}/img/phone.JPG", mock_server.uri())])
    );

    let cable = &entries[2];
    assert_eq!(cable["id"], 10002);
    assert_eq!(cable["name"], "Cable");
    assert_eq!(cable["price"], 3.99);
}

#[tokio::test]
async fn test_second_harvest_adds_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/en/", r#"<a href="/en/p/40001">A</a>"#, 2).await;
    mount_page(
        &mock_server,
        "/en/p/40001",
        r#"<h1>A</h1><span class="price">10</span>"#,
        2,
    )
    .await;

    let first = run_crawl(create_test_config(&mock_server.uri(), dir.path()))
        .await
        .unwrap();
    let before = std::fs::read_to_string(dir.path().join("products.json")).unwrap();

    let second = run_crawl(create_test_config(&mock_server.uri(), dir.path()))
        .await
        .unwrap();
    let after = std::fs::read_to_string(dir.path().join("products.json")).unwrap();

    assert_eq!(first.merge.unwrap().added, 1);
    assert_eq!(second.merge.unwrap().added, 0);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_cancelled_crawl_keeps_collected_products() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/en/", r#"<a href="/en/p/30001">Fast</a>"#, 1).await;
    mount_page(
        &mock_server,
        "/en/p/30001",
        r#"<h1>Fast</h1><a href="/en/p/30002">Slow</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/en/p/30002"))
        .respond_with(html("<h1>Slow</h1>").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.politeness_delay_ms = 0;
    config.fetcher.timeout_secs = 60;

    let coordinator = Coordinator::new(config).unwrap();
    let handle = coordinator.handle();
    let crawl = tokio::spawn(coordinator.run());

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), crawl)
        .await
        .expect("workers should stop promptly after cancel")
        .unwrap()
        .unwrap();

    assert!(outcome.stats.interrupted);
    assert_eq!(outcome.products.len(), 1);
    assert_eq!(outcome.products[0].id, Some(30001));
    assert_eq!(outcome.stats.count(PageState::Skipped), 1);
}

#[tokio::test]
async fn test_cancelled_harvest_still_saves_and_merges() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/en/", r#"<a href="/en/p/50001">Fast</a>"#, 1).await;
    mount_page(
        &mock_server,
        "/en/p/50001",
        r#"<h1>Fast</h1><span class="price">7</span><a href="/en/p/50002">Slow</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/en/p/50002"))
        .respond_with(html("<h1>Slow</h1>").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.crawler.politeness_delay_ms = 0;
    config.fetcher.timeout_secs = 60;

    let coordinator = Coordinator::new(config).unwrap();
    let handle = coordinator.handle();
    let run = tokio::spawn(harvest(coordinator));

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("harvest should finish promptly after cancel")
        .unwrap()
        .unwrap();

    assert!(stats.interrupted);
    assert_eq!(stats.merge.map(|m| m.added), Some(1));

    let scraped = read_json(&dir.path().join("data/scraped_products.json"));
    let scraped = scraped.as_array().unwrap();
    assert_eq!(scraped.len(), 1);
    assert_eq!(scraped[0]["id"], 50001);

    let catalog = read_json(&dir.path().join("products.json"));
    let entries = catalog.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], 50001);
    assert_eq!(entries[0]["price"], 7.0);
}
