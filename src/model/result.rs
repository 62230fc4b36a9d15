//! Crawl outcome types

use crate::model::{DataSource, StockRecord};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one crawl invocation
///
/// Built once at the end of a crawl and never modified afterwards, so the
/// fields are only reachable through accessors. `error` is present exactly
/// when `success` is false.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    success: bool,
    #[serde(rename = "data")]
    records: Vec<StockRecord>,
    timestamp: String,
    #[serde(rename = "dataCount")]
    record_count: usize,
    retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<DataSource>,
    duration_ms: u64,
}

impl CrawlResult {
    /// Builds the result of a crawl that fetched, parsed and persisted
    pub fn succeeded(
        records: Vec<StockRecord>,
        source: DataSource,
        retry_count: u32,
        duration: Duration,
    ) -> Self {
        Self {
            success: true,
            record_count: records.len(),
            records,
            timestamp: now_iso8601(),
            retry_count,
            error: None,
            source: Some(source),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Builds the result of a crawl that stopped at fetch or persist
    pub fn failed(error: impl Into<String>, retry_count: u32, duration: Duration) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown crawl failure".to_string();
        }

        Self {
            success: false,
            records: Vec::new(),
            timestamp: now_iso8601(),
            record_count: 0,
            retry_count,
            error: Some(error),
            source: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Attempts consumed beyond the first one
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> Option<DataSource> {
        self.source
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
