//! Integration tests for Stock-Crawler
//!
//! These tests use wiremock to stand in for the quote page and tempfile for
//! the data directory.

mod crawl_tests;
mod fetch_tests;
mod scheduler_tests;

use stock_crawler::config::Config;

/// Builds a configuration pointing at `base_url` with fast retries
pub fn create_test_config(base_url: &str, data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.target.url = format!("{}/quotes", base_url);
    config.target.timeout_secs = 5;
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 10;
    config.retry.backoff_multiplier = 2.0;
    config.storage.data_dir = data_dir.display().to_string();
    config.log.file = data_dir.join("crawler.log").display().to_string();
    config
}

/// A quote page carrying an embedded `stockData` payload
pub fn embedded_page() -> String {
    r#"<html><head><script>
        var stockData = [
            {"code": "600519", "name": "贵州茅台", "price": "1688.00", "change": "1.25%", "volume": 23456},
            {"code": "000001", "name": "平安银行", "price": 10.52, "change": -0.38, "pe": 4.6},
            {"name": "no code here", "price": 1.0}
        ];
    </script></head><body></body></html>"#
        .to_string()
}
