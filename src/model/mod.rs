//! Data model shared by the crawler, the parser and the snapshot store
//!
//! # Components
//!
//! - `StockRecord`: one instrument's quote
//! - `DataSource`: provenance of a batch of records
//! - `CrawlResult`: the immutable outcome of one crawl
//! - `CrawlPhase`: where a running crawl currently is

mod phase;
mod result;
mod stock;

// Re-export main types
pub use phase::CrawlPhase;
pub use result::{now_iso8601, CrawlResult};
pub use stock::{DataSource, StockRecord};
