use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Stock-Crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// The page to crawl and how to request it
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the quote page
    #[serde(default = "default_target_url")]
    pub url: String,

    /// Query parameters appended to the URL
    #[serde(default = "default_params")]
    pub params: BTreeMap<String, String>,

    /// Fixed request headers (header name -> value)
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Network timeout for a single attempt (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Exponential backoff policy for fetch attempts
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each further failure
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

/// Wall-clock trigger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Local trigger times in `HH:MM`
    #[serde(default = "default_times")]
    pub times: Vec<String>,

    /// How often the scheduler compares the clock (seconds)
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the current snapshot and the history folder
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,
}

/// Crawl log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Append-only log file
    #[serde(default = "default_log_file")]
    pub file: String,

    /// Number of entries kept in memory
    #[serde(rename = "recent-capacity", default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_target_url(),
            params: default_params(),
            headers: default_headers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: default_times(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            recent_capacity: default_recent_capacity(),
        }
    }
}

fn default_target_url() -> String {
    "https://www.cnfin.com/quote/stock/index.html".to_string()
}

fn default_params() -> BTreeMap<String, String> {
    [
        ("code", "SS.ESA.M,SZ.ESA.M,SZ.ESA.SMSE,SZ.ESA.GEM,SS.KSH,SZ.ESA.SMSE"),
        ("t", "1"),
        ("idx", "0"),
        ("curmb", "股票,沪市A股"),
        ("announ", "lc"),
        ("leftnav", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_headers() -> BTreeMap<String, String> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
        ("Referer", "https://www.cnfin.com/"),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ("Cache-Control", "no-cache"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    3000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_times() -> Vec<String> {
    vec!["11:30".to_string(), "15:00".to_string()]
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_log_file() -> String {
    "./logs/stock-crawler.log".to_string()
}

fn default_recent_capacity() -> usize {
    100
}
