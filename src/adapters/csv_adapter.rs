//! CSV file data adapter.
//!
//! Expects a header row naming `timestamp`, `symbol` and `price` columns (any
//! order, extra columns ignored). Symbols are uppercased so that `aapl` and
//! `AAPL` are one instrument. Rows that cannot be parsed are skipped and
//! reported back in [`MarketFeed::skipped`]. Non-positive prices are passed
//! through so the engine can log them against their tick.

use crate::domain::error::TickreplayError;
use crate::domain::observation::{MarketObservation, parse_timestamp};
use crate::ports::data_port::{DataPort, MarketFeed, SkippedRow};
use chrono::NaiveDateTime;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    timestamp: usize,
    symbol: usize,
    price: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, TickreplayError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| TickreplayError::Data {
                    reason: format!("missing {name} column"),
                })
        };
        Ok(Self {
            timestamp: find("timestamp")?,
            symbol: find("symbol")?,
            price: find("price")?,
        })
    }
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn reader(&self) -> Result<csv::Reader<File>, TickreplayError> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| TickreplayError::Data {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })
    }
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Result<MarketObservation, String> {
    let ts_str = record
        .get(columns.timestamp)
        .ok_or_else(|| "missing timestamp".to_string())?;
    let timestamp =
        parse_timestamp(ts_str).ok_or_else(|| format!("invalid timestamp '{ts_str}'"))?;

    let symbol = record
        .get(columns.symbol)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing symbol".to_string())?
        .to_uppercase();

    let price_str = record
        .get(columns.price)
        .ok_or_else(|| "missing price".to_string())?;
    let price: f64 = price_str
        .parse()
        .map_err(|e| format!("invalid price '{price_str}': {e}"))?;

    Ok(MarketObservation::new(timestamp, symbol, price))
}

fn in_window(ts: NaiveDateTime, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> bool {
    start.is_none_or(|s| ts >= s) && end.is_none_or(|e| ts <= e)
}

impl DataPort for CsvAdapter {
    fn fetch_observations(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<MarketFeed, TickreplayError> {
        let mut rdr = self.reader()?;
        let headers = rdr.headers().map_err(|e| TickreplayError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut feed = MarketFeed::default();

        for (index, result) in rdr.records().enumerate() {
            let line = result
                .as_ref()
                .ok()
                .and_then(|r| r.position())
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);

            let parsed = result
                .map_err(|e| format!("CSV parse error: {e}"))
                .and_then(|record| parse_row(&record, &columns));

            match parsed {
                Ok(obs) if in_window(obs.timestamp, start, end) => feed.observations.push(obs),
                Ok(_) => {}
                Err(reason) => {
                    warn!(line, "skipping row: {reason}");
                    feed.skipped.push(SkippedRow { line, reason });
                }
            }
        }

        // Stable: ties keep file order.
        feed.observations.sort_by_key(|o| o.timestamp);

        debug!(
            path = %self.path.display(),
            observations = feed.observations.len(),
            skipped = feed.skipped.len(),
            "loaded market data"
        );
        Ok(feed)
    }
}
