//! JSON report: the full run result plus computed metrics.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TickreplayError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct JsonReport<'a> {
    strategy: &'a str,
    metrics: &'a Metrics,
    #[serde(flatten)]
    result: &'a BacktestResult,
}

pub struct JsonReportAdapter {
    strategy_name: String,
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(strategy_name: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            pretty: true,
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn to_value(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
    ) -> Result<serde_json::Value, TickreplayError> {
        serde_json::to_value(self.report(result, metrics)).map_err(report_error)
    }

    fn report<'a>(&'a self, result: &'a BacktestResult, metrics: &'a Metrics) -> JsonReport<'a> {
        JsonReport {
            strategy: &self.strategy_name,
            metrics,
            result,
        }
    }
}

fn report_error(e: serde_json::Error) -> TickreplayError {
    TickreplayError::Report {
        reason: format!("JSON serialization failed: {e}"),
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), TickreplayError> {
        let file = File::create(output_path).map_err(|e| TickreplayError::Report {
            reason: format!("failed to create {}: {}", output_path, e),
        })?;
        let writer = BufWriter::new(file);
        let report = self.report(result, metrics);
        if self.pretty {
            serde_json::to_writer_pretty(writer, &report).map_err(report_error)?;
        } else {
            serde_json::to_writer(writer, &report).map_err(report_error)?;
        }
        info!(path = output_path, "json report written");
        Ok(())
    }
}
