//! Per-tick error accounting keyed by time bucket.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::TickError;
use super::observation::TimeBucket;

/// Bucket key for input rows rejected before they became observations.
pub const UNPARSED_BUCKET: &str = "unparsed";

/// (bucket, count) pair as exposed to reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub bucket: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub bucket: String,
    pub timestamp: Option<NaiveDateTime>,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorLog {
    counts: BTreeMap<String, usize>,
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        bucket: String,
        timestamp: Option<NaiveDateTime>,
        kind: &str,
        message: String,
    ) {
        *self.counts.entry(bucket.clone()).or_insert(0) += 1;
        self.entries.push(ErrorEntry {
            bucket,
            timestamp,
            kind: kind.to_string(),
            message,
        });
    }

    pub fn record_tick(&mut self, bucket: TimeBucket, timestamp: NaiveDateTime, err: &TickError) {
        self.record(
            bucket.key(timestamp),
            Some(timestamp),
            err.kind(),
            err.to_string(),
        );
    }

    /// Records an input row that never became an observation.
    pub fn record_unparsed(&mut self, message: String) {
        self.record(UNPARSED_BUCKET.to_string(), None, "unparsed_row", message);
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, bucket: &str) -> usize {
        self.counts.get(bucket).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Counts per bucket in key order.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.counts
            .iter()
            .map(|(bucket, &count)| ErrorRecord {
                bucket: bucket.clone(),
                count,
            })
            .collect()
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// Entry count per error kind.
    pub fn kinds(&self) -> BTreeMap<&str, usize> {
        let mut kinds = BTreeMap::new();
        for entry in &self.entries {
            *kinds.entry(entry.kind.as_str()).or_insert(0) += 1;
        }
        kinds
    }
}
