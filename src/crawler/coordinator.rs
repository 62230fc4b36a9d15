//! Crawler coordinator - crawl orchestration logic
//!
//! This module ties the pipeline together:
//! - Building the target URL and HTTP client from configuration
//! - Fetching with retry, parsing, and persisting the snapshots
//! - Turning every outcome into a `CrawlResult`
//! - Guarding against overlapping crawls
//! - Exposing snapshot lookups and the scheduler

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, build_target_url, RetryPolicy, RetryingFetcher};
use crate::crawler::parser::QuoteParser;
use crate::crawler::scheduler::{Clock, CrawlJob, Scheduler, SystemClock};
use crate::logger::{CrawlLogger, LogEntry};
use crate::model::{CrawlPhase, CrawlResult, StockRecord};
use crate::storage::{open_storage, SnapshotStore, StorageResult};
use crate::CrawlerError;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;
use tokio::sync::Mutex;
use url::Url;

/// Main crawler structure
///
/// Built once at startup and shared as `Arc<Crawler>`.
pub struct Crawler {
    target_url: Url,
    fetcher: RetryingFetcher,
    parser: QuoteParser,
    store: Arc<dyn SnapshotStore>,
    logger: Arc<CrawlLogger>,
    scheduler: Arc<Scheduler>,

    /// Held for the whole duration of a crawl
    in_flight: Mutex<()>,

    phase: AtomicU8,
}

/// Scheduler job that runs a crawl on a spawned task
///
/// Bound to its crawler once the crawler exists; fires before that are ignored.
#[derive(Default)]
struct ScheduledCrawl {
    crawler: OnceLock<Weak<Crawler>>,
}

impl CrawlJob for ScheduledCrawl {
    fn trigger(&self) {
        if let Some(crawler) = self.crawler.get().and_then(Weak::upgrade) {
            tokio::spawn(async move {
                crawler.scheduled_crawl().await;
            });
        }
    }
}

impl Crawler {
    /// Creates a crawler with the file-backed store and the system clock
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `logger` - The crawl log shared with the store and scheduler
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<Crawler>)` - Ready to crawl
    /// * `Err(CrawlerError)` - Bad target URL, HTTP client or data directory
    pub fn new(config: &Config, logger: Arc<CrawlLogger>) -> Result<Arc<Self>, CrawlerError> {
        let store = open_storage(Path::new(&config.storage.data_dir), logger.clone())?;
        Self::with_parts(config, Arc::new(store), Arc::new(SystemClock), logger)
    }

    /// Creates a crawler around an explicit store and clock
    pub fn with_parts(
        config: &Config,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        logger: Arc<CrawlLogger>,
    ) -> Result<Arc<Self>, CrawlerError> {
        let target_url = build_target_url(&config.target)?;
        let client = build_http_client(&config.target)?;
        let fetcher = RetryingFetcher::new(
            client,
            RetryPolicy::from_config(&config.retry),
            logger.clone(),
        );
        let parser = QuoteParser::new(logger.clone());

        let job = Arc::new(ScheduledCrawl::default());
        let scheduler =
            Scheduler::from_config(&config.schedule, clock, job.clone(), logger.clone())?;

        let crawler = Arc::new(Self {
            target_url,
            fetcher,
            parser,
            store,
            logger,
            scheduler: Arc::new(scheduler),
            in_flight: Mutex::new(()),
            phase: AtomicU8::new(CrawlPhase::Idle.as_u8()),
        });
        // A fresh job is never bound twice
        let _ = job.crawler.set(Arc::downgrade(&crawler));

        Ok(crawler)
    }

    /// The fully built target URL, query parameters included
    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    /// Current pipeline phase
    pub fn phase(&self) -> CrawlPhase {
        CrawlPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, next: CrawlPhase) {
        let current = self.phase();
        if !current.can_transition_to(next) {
            tracing::debug!("Unexpected crawl phase transition {} -> {}", current, next);
        }
        self.phase.store(next.as_u8(), Ordering::SeqCst);
    }

    /// Runs one crawl: fetch, parse, persist
    ///
    /// Never fails: fetch exhaustion and write failures come back as a
    /// failed `CrawlResult`. If another crawl is running this waits for it
    /// to finish first.
    pub async fn crawl(&self) -> CrawlResult {
        let _guard = self.in_flight.lock().await;
        self.run_pipeline().await
    }

    /// On-demand crawl; same behavior as [`Crawler::crawl`]
    pub async fn manual_crawl(&self) -> CrawlResult {
        self.crawl().await
    }

    /// Crawl fired by the scheduler
    ///
    /// Skipped (and logged) if a crawl is already running.
    ///
    /// # Returns
    ///
    /// * `Some(CrawlResult)` - The crawl ran
    /// * `None` - Skipped because another crawl was in flight
    pub async fn scheduled_crawl(&self) -> Option<CrawlResult> {
        match self.in_flight.try_lock() {
            Ok(_guard) => Some(self.run_pipeline().await),
            Err(_) => {
                self.logger.warning(
                    "Scheduled crawl skipped: previous crawl still running",
                    Some(json!({ "phase": self.phase().to_string() })),
                );
                None
            }
        }
    }

    async fn run_pipeline(&self) -> CrawlResult {
        let start_time = Instant::now();
        self.logger.info(
            "Starting stock data crawl",
            Some(json!({ "url": self.target_url.as_str() })),
        );

        self.set_phase(CrawlPhase::Fetching);
        let fetched = match self.fetcher.fetch(&self.target_url).await {
            Ok(fetched) => fetched,
            Err(e) => return self.finish_failed(e.to_string(), e.attempts(), start_time),
        };

        self.set_phase(CrawlPhase::Parsing);
        let batch = self.parser.parse(&fetched.body);

        self.set_phase(CrawlPhase::Persisting);
        if let Err(e) = self.persist(&batch.records) {
            return self.finish_failed(
                format!("Failed to persist snapshot: {}", e),
                fetched.retry_count,
                start_time,
            );
        }

        self.set_phase(CrawlPhase::Idle);
        let duration = start_time.elapsed();
        self.logger.info(
            "Stock data crawl completed successfully",
            Some(json!({
                "dataCount": batch.records.len(),
                "duration": format!("{}ms", duration.as_millis()),
                "retryCount": fetched.retry_count,
                "source": batch.source.to_string(),
            })),
        );

        CrawlResult::succeeded(batch.records, batch.source, fetched.retry_count, duration)
    }

    /// Writes the current snapshot, then today's history snapshot
    fn persist(&self, records: &[StockRecord]) -> StorageResult<()> {
        self.store.save_current(records)?;
        self.store.save_history(records)?;
        Ok(())
    }

    fn finish_failed(&self, error: String, retry_count: u32, start_time: Instant) -> CrawlResult {
        self.set_phase(CrawlPhase::Idle);
        let duration = start_time.elapsed();

        self.logger.error(
            "Stock data crawl failed",
            Some(json!({
                "error": error,
                "dataCount": 0,
                "duration": format!("{}ms", duration.as_millis()),
                "retryCount": retry_count,
            })),
        );

        CrawlResult::failed(error, retry_count, duration)
    }

    // ===== Snapshot lookups =====

    /// Records of the latest successful crawl
    pub fn current_data(&self) -> Vec<StockRecord> {
        self.store.load_current()
    }

    /// Records stored for `date` (`YYYY-MM-DD`)
    pub fn history_data(&self, date: &str) -> Vec<StockRecord> {
        self.store.load_history(date)
    }

    /// Every stored history date, most recent first
    pub fn history_dates(&self) -> Vec<String> {
        self.store.list_history_dates()
    }

    /// History snapshots with `start <= date <= end`
    pub fn history_range(&self, start: &str, end: &str) -> BTreeMap<String, Vec<StockRecord>> {
        self.store.load_history_range(start, end)
    }

    /// Most recent crawl log entries, oldest first
    pub fn recent_logs(&self, count: usize) -> Vec<LogEntry> {
        self.logger.recent(count)
    }

    // ===== Scheduling =====

    /// Starts background triggering at the configured times
    ///
    /// Returns false (and logs a warning) if the scheduler is already running.
    pub fn start_scheduler(&self) -> bool {
        self.scheduler.start()
    }

    /// Stops background triggering
    pub fn stop_scheduler(&self) {
        self.scheduler.stop();
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}
