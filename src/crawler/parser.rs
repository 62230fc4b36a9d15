//! Quote page parser
//!
//! Extraction runs an ordered list of strategies over the fetched body and
//! concatenates what they find:
//! 1. An embedded `var stockData = [...]` script payload
//! 2. Table rows whose class mentions `stock`
//!
//! A failing strategy is logged and skipped. If nothing at all is found the
//! parser falls back to a fixed set of placeholder instruments so callers
//! always receive a well-formed, non-empty batch.

use crate::logger::CrawlLogger;
use crate::model::{now_iso8601, DataSource, StockRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Errors raised inside a single extraction strategy
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid embedded JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Records extracted from one page, with their provenance
#[derive(Debug, Clone)]
pub struct ParsedBatch {
    pub records: Vec<StockRecord>,
    pub source: DataSource,
}

/// One way of pulling records out of a page body
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in log entries
    fn name(&self) -> &'static str;

    /// Extracts records; `update_time` is stamped onto every record
    fn extract(&self, body: &str, update_time: &str) -> Result<Vec<StockRecord>, ParseError>;
}

// ===== Field aliases =====
//
// Upstream payloads name the same field differently. Each list is tried in
// order and the first present key wins; null and empty strings are absent.

const CODE_KEYS: &[&str] = &["code", "s", "symbol"];
const NAME_KEYS: &[&str] = &["name", "n"];
const PRICE_KEYS: &[&str] = &["price", "p", "close"];
const CHANGE_PERCENT_KEYS: &[&str] = &["change", "cp", "chg"];
const CHANGE_AMOUNT_KEYS: &[&str] = &["changeAmount", "ca"];
const VOLUME_KEYS: &[&str] = &["volume", "vol", "v"];
const AMOUNT_KEYS: &[&str] = &["amount", "amt"];
const AMPLITUDE_KEYS: &[&str] = &["amplitude", "amp"];
const HIGH_KEYS: &[&str] = &["high", "h"];
const LOW_KEYS: &[&str] = &["low", "l"];
const OPEN_KEYS: &[&str] = &["open", "o"];
const CLOSE_KEYS: &[&str] = &["close", "c"];
const TURNOVER_KEYS: &[&str] = &["turnover", "turn"];
const PE_KEYS: &[&str] = &["pe"];
const MARKET_CAP_KEYS: &[&str] = &["marketCap", "mcap"];

/// Returns the value of the first alias present in `item`
fn lookup<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

fn text_field(item: &Map<String, Value>, keys: &[&str]) -> String {
    match lookup(item, keys) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number_field(item: &Map<String, Value>, keys: &[&str]) -> f64 {
    let value = match lookup(item, keys) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_number(s),
        _ => 0.0,
    };
    finite_or_zero(value)
}

/// Parses a numeric string, falling back to its numeric prefix
fn parse_number(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => leading_number(s),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Parses the numeric prefix of `s` (`"12.5元"` -> 12.5), or 0
fn leading_number(s: &str) -> f64 {
    let s = s.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }

    s[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Decodes one embedded payload item through the alias tables
fn record_from_item(item: &Map<String, Value>, update_time: &str) -> StockRecord {
    StockRecord {
        code: text_field(item, CODE_KEYS),
        name: text_field(item, NAME_KEYS),
        price: number_field(item, PRICE_KEYS),
        change_percent: number_field(item, CHANGE_PERCENT_KEYS),
        change_amount: number_field(item, CHANGE_AMOUNT_KEYS),
        volume: number_field(item, VOLUME_KEYS).trunc(),
        amount: number_field(item, AMOUNT_KEYS),
        amplitude: number_field(item, AMPLITUDE_KEYS),
        high: number_field(item, HIGH_KEYS),
        low: number_field(item, LOW_KEYS),
        open: number_field(item, OPEN_KEYS),
        close: number_field(item, CLOSE_KEYS),
        turnover: number_field(item, TURNOVER_KEYS),
        price_earnings_ratio: number_field(item, PE_KEYS),
        market_cap: number_field(item, MARKET_CAP_KEYS),
        update_time: update_time.to_string(),
    }
}

// ===== Strategies =====

/// Extracts the `var stockData = [...];` script payload
pub struct EmbeddedDataStrategy;

fn embedded_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)var\s+stockData\s*=\s*(\[.*?\]);").expect("embedded data pattern")
    })
}

impl ExtractionStrategy for EmbeddedDataStrategy {
    fn name(&self) -> &'static str {
        "embedded-data"
    }

    fn extract(&self, body: &str, update_time: &str) -> Result<Vec<StockRecord>, ParseError> {
        let payload = match embedded_pattern().captures(body).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return Ok(Vec::new()),
        };

        let items = match serde_json::from_str::<Value>(payload)? {
            Value::Array(items) => items,
            other => {
                return Err(ParseError::UnexpectedShape(format!(
                    "expected an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| record_from_item(item, update_time))
            .collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Extracts `<tr class="...stock...">` rows
///
/// The code is the first six-digit run in the row, the name is the first
/// cell, and the price is the first other cell holding a bare number. Rows
/// without a code are skipped.
pub struct TableRowStrategy;

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|\D)(\d{6})(?:\D|$)").expect("code pattern"))
}

fn bare_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").expect("number pattern"))
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

impl TableRowStrategy {
    fn parse_row(row: &ElementRef<'_>, cells: &Selector, update_time: &str) -> Option<StockRecord> {
        let texts: Vec<String> = row.select(cells).map(|cell| cell_text(&cell)).collect();
        let row_text = if texts.is_empty() {
            row.text().collect::<Vec<_>>().join(" ")
        } else {
            texts.join(" ")
        };

        let code = code_pattern()
            .captures(&row_text)
            .and_then(|c| c.get(1))?
            .as_str()
            .to_string();

        let name = texts
            .first()
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| code.clone());

        let price = texts
            .iter()
            .filter(|text| **text != code)
            .find(|text| bare_number_pattern().is_match(text))
            .and_then(|text| text.parse::<f64>().ok())
            .map(finite_or_zero)
            .unwrap_or(0.0);

        let mut record = StockRecord::new(code, name, update_time);
        record.price = price;
        Some(record)
    }
}

impl ExtractionStrategy for TableRowStrategy {
    fn name(&self) -> &'static str {
        "table-rows"
    }

    fn extract(&self, body: &str, update_time: &str) -> Result<Vec<StockRecord>, ParseError> {
        let rows = Selector::parse(r#"tr[class*="stock"]"#)
            .map_err(|e| ParseError::Selector(format!("{:?}", e)))?;
        let cells = Selector::parse("td").map_err(|e| ParseError::Selector(format!("{:?}", e)))?;

        let document = Html::parse_document(body);

        Ok(document
            .select(&rows)
            .filter_map(|row| Self::parse_row(&row, &cells, update_time))
            .collect())
    }
}

// ===== Placeholder data =====

/// Well-known instruments used when nothing could be extracted
pub const PLACEHOLDER_STOCKS: [(&str, &str); 10] = [
    ("000001", "平安银行"),
    ("000002", "万科A"),
    ("600000", "浦发银行"),
    ("600016", "民生银行"),
    ("600036", "招商银行"),
    ("600519", "贵州茅台"),
    ("601318", "中国平安"),
    ("601398", "工商银行"),
    ("601857", "中国石油"),
    ("603259", "药明康德"),
];

/// Generates the placeholder batch: fixed instruments, random values
pub fn placeholder_records(update_time: &str) -> Vec<StockRecord> {
    PLACEHOLDER_STOCKS
        .iter()
        .map(|(code, name)| StockRecord {
            code: code.to_string(),
            name: name.to_string(),
            price: fastrand::f64() * 100.0 + 10.0,
            change_percent: (fastrand::f64() - 0.5) * 10.0,
            change_amount: (fastrand::f64() - 0.5) * 5.0,
            volume: (fastrand::f64() * 100_000_000.0).floor(),
            amount: (fastrand::f64() * 10_000_000_000.0).floor(),
            amplitude: fastrand::f64() * 5.0,
            high: fastrand::f64() * 100.0 + 10.0,
            low: fastrand::f64() * 100.0 + 10.0,
            open: fastrand::f64() * 100.0 + 10.0,
            close: fastrand::f64() * 100.0 + 10.0,
            turnover: fastrand::f64() * 5.0,
            price_earnings_ratio: fastrand::f64() * 50.0,
            market_cap: fastrand::f64() * 100_000_000_000.0,
            update_time: update_time.to_string(),
        })
        .collect()
}

// ===== Parser =====

/// Runs the extraction strategies in priority order
pub struct QuoteParser {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    logger: Arc<CrawlLogger>,
}

impl QuoteParser {
    /// Creates a parser with the default strategies
    pub fn new(logger: Arc<CrawlLogger>) -> Self {
        Self::with_strategies(
            vec![Box::new(EmbeddedDataStrategy), Box::new(TableRowStrategy)],
            logger,
        )
    }

    /// Creates a parser with a custom strategy list
    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        logger: Arc<CrawlLogger>,
    ) -> Self {
        Self { strategies, logger }
    }

    /// Extracts records from `body`
    ///
    /// Never fails. Records without a code are dropped; every numeric field
    /// of a returned record is finite.
    pub fn parse(&self, body: &str) -> ParsedBatch {
        let update_time = now_iso8601();
        let mut records = Vec::new();

        for strategy in &self.strategies {
            match strategy.extract(body, &update_time) {
                Ok(found) => {
                    let total = found.len();
                    let before = records.len();
                    records.extend(found.into_iter().filter(StockRecord::is_valid));
                    let kept = records.len() - before;

                    if kept == 0 {
                        self.logger.warning(
                            format!("Extraction strategy {} found no records", strategy.name()),
                            Some(json!({ "strategy": strategy.name(), "dropped": total })),
                        );
                    } else {
                        tracing::debug!(
                            "Strategy {} extracted {} record(s), dropped {} without a code",
                            strategy.name(),
                            kept,
                            total - kept
                        );
                    }
                }
                Err(e) => {
                    self.logger.warning(
                        format!("Extraction strategy {} failed", strategy.name()),
                        Some(json!({ "strategy": strategy.name(), "error": e.to_string() })),
                    );
                }
            }
        }

        if records.is_empty() {
            self.logger
                .warning("No stock data found in page, generating sample data", None);
            return ParsedBatch {
                records: placeholder_records(&update_time),
                source: DataSource::Placeholder,
            };
        }

        ParsedBatch {
            records,
            source: DataSource::Extracted,
        }
    }
}
