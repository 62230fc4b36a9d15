//! Scheduled crawling through the crawler's own scheduler

use crate::{create_test_config, embedded_page};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use stock_crawler::crawler::Clock;
use stock_crawler::storage::JsonFileStore;
use stock_crawler::{CrawlLogger, Crawler};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[tokio::test]
async fn test_scheduler_fires_crawl_once_per_trigger() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded_page()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.schedule.times = vec!["11:30".to_string()];
    config.schedule.poll_interval_secs = 1;

    let logger = Arc::new(CrawlLogger::in_memory(100));
    let store = Arc::new(JsonFileStore::new(dir.path(), logger.clone()).unwrap());
    let crawler = Crawler::with_parts(
        &config,
        store,
        Arc::new(FixedClock(at("2024-01-02 11:30:05"))),
        logger.clone(),
    )
    .unwrap();

    assert!(crawler.start_scheduler());
    assert!(!crawler.start_scheduler());

    // First tick is immediate; the next ones land in the same minute
    tokio::time::sleep(Duration::from_millis(2500)).await;
    crawler.stop_scheduler();

    let entries = logger.recent(100);
    let fired = entries
        .iter()
        .filter(|e| e.message == "Scheduled crawl triggered")
        .count();
    assert_eq!(fired, 1);
    assert!(entries
        .iter()
        .any(|e| e.message == "Scheduler already running"));
    assert!(entries
        .iter()
        .any(|e| e.message == "Stock data crawl completed successfully"));
    assert_eq!(crawler.current_data().len(), 2);
}

#[tokio::test]
async fn test_scheduler_idle_outside_trigger_times() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded_page()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path());
    config.schedule.poll_interval_secs = 1;

    let logger = Arc::new(CrawlLogger::in_memory(100));
    let store = Arc::new(JsonFileStore::new(dir.path(), logger.clone()).unwrap());
    let crawler = Crawler::with_parts(
        &config,
        store,
        Arc::new(FixedClock(at("2024-01-02 09:00:00"))),
        logger,
    )
    .unwrap();

    crawler.start_scheduler();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    crawler.stop_scheduler();

    assert!(!crawler.scheduler().is_armed());
    assert!(crawler.current_data().is_empty());
}
