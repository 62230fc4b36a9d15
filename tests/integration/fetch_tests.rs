//! Retry behavior of the fetcher against a mock server

use crate::create_test_config;
use std::sync::Arc;
use std::time::Duration;
use stock_crawler::crawler::{build_http_client, RetryPolicy, RetryingFetcher};
use stock_crawler::CrawlLogger;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_fetcher(base_url: &str, max_attempts: u32) -> (RetryingFetcher, Arc<CrawlLogger>) {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(base_url, dir.path());
    let logger = Arc::new(CrawlLogger::in_memory(100));
    let policy = RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
    };
    let client = build_http_client(&config.target).unwrap();
    (RetryingFetcher::new(client, policy, logger.clone()), logger)
}

#[tokio::test]
async fn test_fetch_recovers_after_two_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&mock_server)
        .await;

    let (fetcher, logger) = create_fetcher(&mock_server.uri(), 3);
    let url = Url::parse(&format!("{}/quotes", mock_server.uri())).unwrap();

    let fetched = fetcher.fetch(&url).await.unwrap();
    assert_eq!(fetched.body, "hello");
    assert_eq!(fetched.retry_count, 2);

    let retries = logger
        .recent(100)
        .iter()
        .filter(|e| e.message.starts_with("Fetch failed, retrying"))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (fetcher, logger) = create_fetcher(&mock_server.uri(), 3);
    let url = Url::parse(&format!("{}/quotes", mock_server.uri())).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.attempts(), 3);
    assert!(err.to_string().contains("503"));

    assert!(logger
        .recent(100)
        .iter()
        .any(|e| e.message.starts_with("Fetch failed after 3 attempt")));
}

#[tokio::test]
async fn test_single_attempt_does_not_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, _logger) = create_fetcher(&mock_server.uri(), 1);
    let url = Url::parse(&format!("{}/quotes", mock_server.uri())).unwrap();

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.attempts(), 1);
}
