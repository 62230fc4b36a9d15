//! Crawler module for quote page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with exponential-backoff retry
//! - Multi-strategy quote extraction with a placeholder fallback
//! - Wall-clock scheduling of crawls
//! - Overall crawl coordination and snapshot persistence

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::Crawler;
pub use fetcher::{
    build_http_client, build_target_url, FetchError, Fetched, RetryPolicy, RetryingFetcher,
};
pub use parser::{
    placeholder_records, EmbeddedDataStrategy, ExtractionStrategy, ParseError, ParsedBatch,
    QuoteParser, TableRowStrategy, PLACEHOLDER_STOCKS,
};
pub use scheduler::{Clock, CrawlJob, Scheduler, SystemClock};

pub use crate::model::CrawlResult;
