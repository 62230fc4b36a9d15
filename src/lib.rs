//! Stock-Crawler: a scheduled A-share quote scraper
//!
//! This crate fetches a quote page on a wall-clock schedule, extracts stock
//! records with several fallback strategies, and keeps a current snapshot plus
//! one history snapshot per calendar day.

pub mod config;
pub mod crawler;
pub mod logger;
pub mod model;
pub mod storage;

use thiserror::Error;

/// Main error type for Stock-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid trigger time: {0}")]
    InvalidTime(String),
}

/// Result type alias for Stock-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, Crawler};
pub use logger::{CrawlLogger, LogEntry, LogLevel};
pub use model::{DataSource, StockRecord};
