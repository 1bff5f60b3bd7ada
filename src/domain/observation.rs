//! Market observation records and time bucketing.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use super::error::TickError;

/// A single (timestamp, symbol, price) record from the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketObservation {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub price: f64,
}

impl MarketObservation {
    pub fn new(timestamp: NaiveDateTime, symbol: impl Into<String>, price: f64) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            price,
        }
    }

    /// Checks the fields the engine relies on. Ordering against the previous
    /// tick is checked by the engine, not here.
    pub fn validate(&self) -> Result<(), TickError> {
        if self.symbol.trim().is_empty() {
            return Err(TickError::MalformedObservation {
                reason: "symbol is empty".into(),
            });
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(TickError::MalformedObservation {
                reason: format!("price must be positive, got {}", self.price),
            });
        }
        Ok(())
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 style local timestamp. A bare date means midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Granularity of the error log keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Minute,
    #[default]
    Hour,
    Day,
}

impl TimeBucket {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "minute" => Some(TimeBucket::Minute),
            "hour" => Some(TimeBucket::Hour),
            "day" => Some(TimeBucket::Day),
            _ => None,
        }
    }

    /// Bucket key for a timestamp, e.g. `2025-09-20T14:00` for `Hour`.
    pub fn key(&self, timestamp: NaiveDateTime) -> String {
        match self {
            TimeBucket::Minute => timestamp.format("%Y-%m-%dT%H:%M").to_string(),
            TimeBucket::Hour => format!("{}T{:02}:00", timestamp.date(), timestamp.hour()),
            TimeBucket::Day => timestamp.date().to_string(),
        }
    }
}
