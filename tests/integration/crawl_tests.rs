//! End-to-end crawl cycle tests

use crate::{create_test_config, embedded_page};
use chrono::NaiveDate;
use std::sync::Arc;
use stock_crawler::crawler::SystemClock;
use stock_crawler::storage::{SnapshotStore, StorageError, StorageResult};
use stock_crawler::{CrawlLogger, Crawler, DataSource, LogLevel, StockRecord};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Store that accepts reads but refuses every write
struct FailingStore;

impl SnapshotStore for FailingStore {
    fn save_current(&self, _records: &[StockRecord]) -> StorageResult<()> {
        Err(StorageError::Io {
            path: "current-stocks.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn load_current(&self) -> Vec<StockRecord> {
        Vec::new()
    }

    fn save_history_for(&self, _date: NaiveDate, _records: &[StockRecord]) -> StorageResult<()> {
        Ok(())
    }

    fn load_history(&self, _date: &str) -> Vec<StockRecord> {
        Vec::new()
    }

    fn list_history_dates(&self) -> Vec<String> {
        Vec::new()
    }
}

#[tokio::test]
async fn test_successful_crawl_persists_snapshots() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .and(query_param("leftnav", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(embedded_page())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let logger = Arc::new(CrawlLogger::in_memory(100));
    let crawler = Crawler::new(&config, logger.clone()).unwrap();

    let result = crawler.crawl().await;

    assert!(result.success(), "crawl failed: {:?}", result.error());
    assert_eq!(result.source(), Some(DataSource::Extracted));
    assert_eq!(result.record_count(), 2);
    assert_eq!(result.retry_count(), 0);
    assert_eq!(result.records()[0].code, "600519");
    assert_eq!(result.records()[0].price, 1688.0);
    assert_eq!(result.records()[1].price_earnings_ratio, 4.6);

    assert_eq!(crawler.current_data(), result.records());
    let dates = crawler.history_dates();
    assert_eq!(dates.len(), 1);
    assert_eq!(crawler.history_data(&dates[0]), result.records());

    assert!(dir.path().join("current-stocks.json").exists());
    assert!(logger
        .recent(100)
        .iter()
        .any(|e| e.message == "Stock data crawl completed successfully"));
}

#[tokio::test]
async fn test_page_without_data_uses_placeholders() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>closed</body></html>"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let logger = Arc::new(CrawlLogger::in_memory(100));
    let crawler = Crawler::new(&config, logger.clone()).unwrap();

    let result = crawler.crawl().await;

    assert!(result.success());
    assert_eq!(result.source(), Some(DataSource::Placeholder));
    assert_eq!(result.record_count(), 10);
    assert_eq!(crawler.current_data().len(), 10);
    assert!(logger
        .recent(100)
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message.starts_with("No stock data found")));
}

#[tokio::test]
async fn test_exhausted_fetch_returns_failed_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let crawler = Crawler::new(&config, Arc::new(CrawlLogger::in_memory(100))).unwrap();

    let result = crawler.crawl().await;

    assert!(!result.success());
    assert!(result.records().is_empty());
    assert_eq!(result.record_count(), 0);
    assert_eq!(result.retry_count(), 3);
    assert!(!result.error().unwrap().is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["dataCount"], 0);
    assert!(json["data"].as_array().unwrap().is_empty());

    assert!(crawler.current_data().is_empty());
    assert!(crawler.history_dates().is_empty());
}

#[tokio::test]
async fn test_persist_failure_returns_failed_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded_page()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let logger = Arc::new(CrawlLogger::in_memory(100));
    let crawler = Crawler::with_parts(
        &config,
        Arc::new(FailingStore),
        Arc::new(SystemClock),
        logger.clone(),
    )
    .unwrap();

    let result = crawler.crawl().await;

    assert!(!result.success());
    assert!(result.error().unwrap().contains("disk full"));
    assert!(logger
        .recent(100)
        .iter()
        .any(|e| e.level == LogLevel::Error && e.message == "Stock data crawl failed"));
}

#[tokio::test]
async fn test_concurrent_manual_crawls_serialize() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded_page()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let crawler = Crawler::new(&config, Arc::new(CrawlLogger::in_memory(100))).unwrap();

    let (first, second) = tokio::join!(crawler.manual_crawl(), crawler.manual_crawl());

    assert!(first.success());
    assert!(second.success());
    assert_eq!(crawler.current_data().len(), 2);
}

#[tokio::test]
async fn test_crawl_log_written_to_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded_page()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path());
    let logger = Arc::new(CrawlLogger::new(&config.log.file, config.log.recent_capacity));
    let crawler = Crawler::new(&config, logger).unwrap();

    crawler.crawl().await;

    let contents = std::fs::read_to_string(&config.log.file).unwrap();
    assert!(contents.contains("[INFO] Starting stock data crawl"));
    assert!(contents.contains("[INFO] Stock data crawl completed successfully - {"));
}
