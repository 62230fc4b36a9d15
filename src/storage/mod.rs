//! Storage module for persisting quote snapshots
//!
//! This module handles all snapshot persistence for the crawler, including:
//! - The current snapshot, overwritten by every successful crawl
//! - One history snapshot per calendar date
//! - Point and range lookups over history keys

mod json_store;
mod traits;

pub use json_store::{JsonFileStore, Snapshot};
pub use traits::{history_key, parse_history_key, SnapshotStore, StorageError, StorageResult};

use crate::logger::CrawlLogger;
use crate::CrawlerError;

use std::path::Path;
use std::sync::Arc;

/// Opens or creates the snapshot store under `data_dir`
///
/// # Arguments
///
/// * `data_dir` - Directory holding the snapshot files
/// * `logger` - Crawl log that receives read degradation warnings
///
/// # Returns
///
/// * `Ok(JsonFileStore)` - Store ready for reads and writes
/// * `Err(CrawlerError)` - The directory layout could not be created
pub fn open_storage(
    data_dir: &Path,
    logger: Arc<CrawlLogger>,
) -> Result<JsonFileStore, CrawlerError> {
    Ok(JsonFileStore::new(data_dir, logger)?)
}
