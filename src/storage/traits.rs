//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot stores and
//! associated error types.

use crate::model::StockRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while writing snapshots
///
/// Reads never surface these: a missing or corrupt snapshot reads as empty.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot store implementations
///
/// A store keeps one "current" snapshot and one history snapshot per
/// calendar date. Writes overwrite; the last write of a day wins.
pub trait SnapshotStore: Send + Sync {
    // ===== Current Snapshot =====

    /// Atomically replaces the current snapshot
    fn save_current(&self, records: &[StockRecord]) -> StorageResult<()>;

    /// Loads the current snapshot, or an empty list if none is readable
    fn load_current(&self) -> Vec<StockRecord>;

    // ===== History =====

    /// Writes the history snapshot for `date`
    fn save_history_for(&self, date: NaiveDate, records: &[StockRecord]) -> StorageResult<()>;

    /// Writes the history snapshot for today's local date
    fn save_history(&self, records: &[StockRecord]) -> StorageResult<()> {
        self.save_history_for(chrono::Local::now().date_naive(), records)
    }

    /// Loads the history snapshot keyed `date` (`YYYY-MM-DD`)
    fn load_history(&self, date: &str) -> Vec<StockRecord>;

    /// Lists every history key, most recent first
    fn list_history_dates(&self) -> Vec<String>;

    /// Loads every history snapshot with `start <= date <= end`
    ///
    /// Keys are fixed-width and zero-padded, so string comparison orders
    /// them by date.
    fn load_history_range(&self, start: &str, end: &str) -> BTreeMap<String, Vec<StockRecord>> {
        self.list_history_dates()
            .into_iter()
            .filter(|date| date.as_str() >= start && date.as_str() <= end)
            .map(|date| {
                let records = self.load_history(&date);
                (date, records)
            })
            .collect()
    }
}

/// Formats a date as a history key
pub fn history_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a history key, accepting only the canonical zero-padded form
///
/// `2024-1-2` is rejected even though it names a real date.
pub fn parse_history_key(key: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()?;
    (history_key(date) == key).then_some(date)
}
