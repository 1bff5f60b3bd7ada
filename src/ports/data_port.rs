//! Data access port trait.

use crate::domain::error::TickreplayError;
use crate::domain::observation::MarketObservation;
use chrono::NaiveDateTime;

/// A row of the source that could not be turned into an observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line in the source, header included.
    pub line: u64,
    pub reason: String,
}

/// Observations sorted by timestamp, plus whatever was dropped on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketFeed {
    pub observations: Vec<MarketObservation>,
    pub skipped: Vec<SkippedRow>,
}

impl MarketFeed {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// (first, last) timestamp of the feed.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.observations.first()?.timestamp;
        let last = self.observations.last()?.timestamp;
        Some((first, last))
    }
}

pub trait DataPort {
    /// Loads observations whose timestamps fall within `[start, end]`.
    /// Either bound may be open.
    fn fetch_observations(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<MarketFeed, TickreplayError>;
}
