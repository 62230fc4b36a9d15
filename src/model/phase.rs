/// Crawl phase definitions
///
/// A crawl moves Idle -> Fetching -> Parsing -> Persisting -> Idle. Any
/// failure returns straight to Idle.
use std::fmt;

/// The stage a crawler is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// No crawl in progress
    Idle,

    /// Waiting on the network, including backoff sleeps
    Fetching,

    /// Running extraction strategies over the fetched body
    Parsing,

    /// Writing the current and history snapshots
    Persisting,
}

impl CrawlPhase {
    /// Validates that a transition to `next` is allowed
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, Parsing)
                | (Parsing, Persisting)
                | (Fetching, Idle)
                | (Parsing, Idle)
                | (Persisting, Idle)
        )
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Fetching => 1,
            Self::Parsing => 2,
            Self::Persisting => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Fetching,
            2 => Self::Parsing,
            3 => Self::Persisting,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Persisting => "persisting",
        };
        write!(f, "{}", s)
    }
}
