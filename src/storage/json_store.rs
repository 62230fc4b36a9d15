//! JSON file snapshot store
//!
//! Layout under the data directory:
//!
//! ```text
//! data/
//! ├── current-stocks.json
//! └── history/
//!     ├── 2024-01-02.json
//!     └── 2024-01-03.json
//! ```

use crate::logger::CrawlLogger;
use crate::model::{now_iso8601, StockRecord};
use crate::storage::traits::{
    history_key, parse_history_key, SnapshotStore, StorageError, StorageResult,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CURRENT_FILE: &str = "current-stocks.json";
const HISTORY_DIR: &str = "history";

/// Persisted snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// History key, only written on history snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub update_time: String,
    #[serde(default)]
    pub data: Vec<StockRecord>,
}

/// Snapshot store backed by a directory of JSON files
pub struct JsonFileStore {
    data_dir: PathBuf,
    logger: Arc<CrawlLogger>,
}

impl JsonFileStore {
    /// Opens (or creates) a store rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>, logger: Arc<CrawlLogger>) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let history_dir = data_dir.join(HISTORY_DIR);

        std::fs::create_dir_all(&history_dir).map_err(|source| StorageError::Io {
            path: history_dir.display().to_string(),
            source,
        })?;

        Ok(Self { data_dir, logger })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn current_path(&self) -> PathBuf {
        self.data_dir.join(CURRENT_FILE)
    }

    fn history_dir(&self) -> PathBuf {
        self.data_dir.join(HISTORY_DIR)
    }

    fn history_path(&self, date: &str) -> PathBuf {
        self.history_dir().join(format!("{}.json", date))
    }

    /// Serializes `snapshot` to a sibling temp file, then renames it over `path`
    fn write_snapshot(&self, path: &Path, snapshot: &Snapshot) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = path.with_extension("json.tmp");

        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };

        std::fs::write(&tmp_path, body).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp_path);
            StorageError::Io {
                path: path.display().to_string(),
                source,
            }
        })?;

        Ok(())
    }

    /// Reads a snapshot's records, degrading to empty on any failure
    fn read_records(&self, path: &Path, what: &str) -> Vec<StockRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                self.logger.warning(
                    format!("Failed to read {} snapshot", what),
                    Some(json!({ "path": path.display().to_string(), "error": e.to_string() })),
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => snapshot.data,
            Err(e) => {
                self.logger.warning(
                    format!("Corrupt {} snapshot ignored", what),
                    Some(json!({ "path": path.display().to_string(), "error": e.to_string() })),
                );
                Vec::new()
            }
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn save_current(&self, records: &[StockRecord]) -> StorageResult<()> {
        let snapshot = Snapshot {
            date: None,
            update_time: now_iso8601(),
            data: records.to_vec(),
        };
        self.write_snapshot(&self.current_path(), &snapshot)
    }

    fn load_current(&self) -> Vec<StockRecord> {
        self.read_records(&self.current_path(), "current")
    }

    fn save_history_for(&self, date: NaiveDate, records: &[StockRecord]) -> StorageResult<()> {
        let key = history_key(date);
        let snapshot = Snapshot {
            date: Some(key.clone()),
            update_time: now_iso8601(),
            data: records.to_vec(),
        };
        self.write_snapshot(&self.history_path(&key), &snapshot)
    }

    fn load_history(&self, date: &str) -> Vec<StockRecord> {
        // Only well-formed keys map to files; this also keeps paths inside history/
        if parse_history_key(date).is_none() {
            self.logger.warning(
                "Ignoring malformed history date",
                Some(json!({ "date": date })),
            );
            return Vec::new();
        }

        self.read_records(&self.history_path(date), "history")
    }

    fn list_history_dates(&self) -> Vec<String> {
        let dir = self.history_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.logger.warning(
                    "Failed to list history snapshots",
                    Some(json!({ "path": dir.display().to_string(), "error": e.to_string() })),
                );
                return Vec::new();
            }
        };

        let mut dates: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?.to_string();
                parse_history_key(&stem)?;
                Some(stem)
            })
            .collect();

        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates
    }
}
