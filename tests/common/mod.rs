#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use tickreplay::domain::error::{StrategyError, TickreplayError};
use tickreplay::domain::observation::MarketObservation;
use tickreplay::domain::position::Position;
use tickreplay::domain::signal::Signal;
use tickreplay::domain::strategy::Strategy;
use tickreplay::ports::data_port::{DataPort, MarketFeed, SkippedRow};

pub struct MockDataPort {
    pub observations: Vec<MarketObservation>,
    pub skipped: Vec<SkippedRow>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(observations: Vec<MarketObservation>) -> Self {
        Self {
            observations,
            skipped: Vec::new(),
            error: None,
        }
    }

    pub fn with_skipped(mut self, line: u64, reason: &str) -> Self {
        self.skipped.push(SkippedRow {
            line,
            reason: reason.to_string(),
        });
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_observations(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<MarketFeed, TickreplayError> {
        if let Some(reason) = &self.error {
            return Err(TickreplayError::Data {
                reason: reason.clone(),
            });
        }
        let observations = self
            .observations
            .iter()
            .filter(|o| start.is_none_or(|s| o.timestamp >= s))
            .filter(|o| end.is_none_or(|e| o.timestamp <= e))
            .cloned()
            .collect();
        Ok(MarketFeed {
            observations,
            skipped: self.skipped.clone(),
        })
    }
}

/// Emits a fixed signal at chosen timestamps and HOLD everywhere else.
pub struct ScriptedStrategy {
    pub script: HashMap<NaiveDateTime, Signal>,
    pub calls: usize,
}

impl ScriptedStrategy {
    pub fn new(script: Vec<(NaiveDateTime, Signal)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: 0,
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        _position: Option<&Position>,
    ) -> Result<Signal, StrategyError> {
        self.calls += 1;
        Ok(self
            .script
            .get(&observation.timestamp)
            .copied()
            .unwrap_or(Signal::Hold))
    }
}

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 20)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap()
}

/// `base_time()` plus `secs` seconds.
pub fn t(secs: i64) -> NaiveDateTime {
    base_time() + Duration::seconds(secs)
}

pub fn obs(secs: i64, symbol: &str, price: f64) -> MarketObservation {
    MarketObservation::new(t(secs), symbol, price)
}

/// One observation per second for `symbol`, following `prices`.
pub fn price_path(symbol: &str, prices: &[f64]) -> Vec<MarketObservation> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| obs(i as i64, symbol, p))
        .collect()
}

pub fn csv_content(observations: &[MarketObservation]) -> String {
    let mut out = String::from("timestamp,symbol,price\n");
    for o in observations {
        out.push_str(&format!(
            "{},{},{}\n",
            o.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f"),
            o.symbol,
            o.price
        ));
    }
    out
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
