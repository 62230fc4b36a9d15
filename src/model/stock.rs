//! Stock quote record

use serde::{Deserialize, Serialize};
use std::fmt;

/// One instrument's quote at a point in time
///
/// Every numeric field is finite; unknown values are stored as `0.0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    /// Six-digit exchange code
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub change_amount: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub amplitude: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub turnover: f64,
    #[serde(default, alias = "pe")]
    pub price_earnings_ratio: f64,
    #[serde(default)]
    pub market_cap: f64,
    /// ISO-8601 timestamp of the crawl that produced the record
    pub update_time: String,
}

impl StockRecord {
    /// Creates a record with only identity fields set
    pub fn new(code: impl Into<String>, name: impl Into<String>, update_time: &str) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            update_time: update_time.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if the record can be kept
    pub fn is_valid(&self) -> bool {
        !self.code.trim().is_empty()
    }

    /// All numeric fields, in declaration order
    pub fn numeric_fields(&self) -> [f64; 13] {
        [
            self.price,
            self.change_percent,
            self.change_amount,
            self.volume,
            self.amount,
            self.amplitude,
            self.high,
            self.low,
            self.open,
            self.close,
            self.turnover,
            self.price_earnings_ratio,
            self.market_cap,
        ]
    }
}

/// Where the records of a crawl came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Extracted from the fetched page
    Extracted,

    /// Generated because nothing could be extracted
    Placeholder,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted => write!(f, "extracted"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}
