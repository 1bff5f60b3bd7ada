//! Markdown performance report.
//!
//! Assembles the report from the helpers in `tables` and `ascii_chart` and
//! writes it through [`ReportPort`].

pub mod ascii_chart;
pub mod tables;

use chrono::NaiveDateTime;
use std::fs;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TickreplayError;
use crate::domain::metrics::{Metrics, periodic_returns};
use crate::ports::report_port::ReportPort;

use self::tables::{format_money, format_pct};

/// Context for rendering a report.
pub struct ReportContext<'a> {
    pub strategy_name: &'a str,
    pub result: &'a BacktestResult,
    pub metrics: &'a Metrics,
    pub generated_at: NaiveDateTime,
}

pub fn render(ctx: &ReportContext) -> String {
    let result = ctx.result;
    let metrics = ctx.metrics;
    let mut output = String::new();

    output.push_str("# Backtest Performance Report\n\n");
    output.push_str(&format!(
        "**Generated on:** {}\n\n",
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    output.push_str("## Executive Summary\n\n");
    output.push_str(&render_summary(ctx));

    output.push_str("## Key Performance Metrics\n\n");
    output.push_str(&tables::render_metrics_table(metrics));

    output.push_str("## Trade Statistics\n\n");
    output.push_str(&tables::render_trade_stats_table(metrics));

    output.push_str("## Equity Curve\n\n```\n");
    output.push_str(&ascii_chart::render_equity_chart(
        &result.equity_curve,
        ascii_chart::DEFAULT_WIDTH,
        ascii_chart::DEFAULT_HEIGHT,
    ));
    output.push_str("\n```\n\n");

    if let Some(stats) = render_returns_stats(result) {
        output.push_str("## Returns Analysis\n\n");
        output.push_str(&stats);
    }

    output.push_str("## Final Positions\n\n");
    output.push_str(&tables::render_positions_table(&result.ledger));

    output.push_str("## Error Analysis\n\n");
    output.push_str(&tables::render_error_summary(&result.error_log));

    output.push_str("## Recent Orders\n\n");
    output.push_str(&tables::render_trade_log(
        &result.trade_log,
        tables::RECENT_TRADES,
    ));

    output.push_str("## Interpretation\n\n");
    output.push_str(&render_interpretation(metrics));

    output
}

fn render_summary(ctx: &ReportContext) -> String {
    let result = ctx.result;
    let metrics = ctx.metrics;
    let period = match (result.equity_curve.first(), result.equity_curve.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first.timestamp, last.timestamp),
        _ => "n/a".to_string(),
    };

    format!(
        "- **Strategy:** {}\n\
         - **Period:** {}\n\
         - **Ticks Processed:** {}\n\
         - **Initial Capital:** {}\n\
         - **Final Equity:** {}\n\
         - **Total Return:** {}\n\
         - **Orders:** {} filled, {} rejected\n\
         - **Errors:** {}\n\n",
        ctx.strategy_name,
        period,
        result.ticks_processed,
        format_money(metrics.initial_capital),
        format_money(metrics.final_equity),
        format_pct(metrics.total_return),
        metrics.orders_filled,
        metrics.orders_rejected,
        metrics.error_count,
    )
}

fn render_returns_stats(result: &BacktestResult) -> Option<String> {
    let mut returns = periodic_returns(&result.equity_curve);
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    returns.sort_by(f64::total_cmp);
    let mid = returns.len() / 2;
    let median = if returns.len() % 2 == 0 {
        (returns[mid - 1] + returns[mid]) / 2.0
    } else {
        returns[mid]
    };

    Some(format!(
        "- **Mean Return:** {:.4}%\n\
         - **Median Return:** {:.4}%\n\
         - **Standard Deviation:** {:.4}%\n\
         - **Min Return:** {:.4}%\n\
         - **Max Return:** {:.4}%\n\n",
        mean * 100.0,
        median * 100.0,
        variance.sqrt() * 100.0,
        returns[0] * 100.0,
        returns[returns.len() - 1] * 100.0,
    ))
}

fn render_interpretation(metrics: &Metrics) -> String {
    let mut notes = Vec::new();

    notes.push(if metrics.total_return > 0.1 {
        "Returns are strongly positive."
    } else if metrics.total_return > 0.0 {
        "Returns are modestly positive."
    } else {
        "The strategy lost money over the period."
    });

    notes.push(if metrics.sharpe_ratio > 1.0 {
        "Risk-adjusted returns are strong (Sharpe above 1)."
    } else if metrics.sharpe_ratio > 0.5 {
        "Risk-adjusted returns are acceptable (Sharpe above 0.5)."
    } else {
        "Risk-adjusted returns are weak (Sharpe at or below 0.5)."
    });

    notes.push(if metrics.max_drawdown < 0.1 {
        "Drawdown stayed below 10%."
    } else if metrics.max_drawdown < 0.2 {
        "Drawdown reached between 10% and 20%."
    } else {
        "Drawdown exceeded 20%."
    });

    if metrics.total_trades < 10 {
        notes.push("Fewer than 10 round trips; statistics are not significant.");
    }
    if metrics.error_count > 0 {
        notes.push("Some ticks were skipped; see Error Analysis.");
    }

    let mut output = String::new();
    for note in notes {
        output.push_str(&format!("- {}\n", note));
    }
    output.push('\n');
    output
}

pub struct MarkdownReportAdapter {
    strategy_name: String,
    generated_at: NaiveDateTime,
}

impl MarkdownReportAdapter {
    pub fn new(strategy_name: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            generated_at,
        }
    }
}

impl ReportPort for MarkdownReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), TickreplayError> {
        let ctx = ReportContext {
            strategy_name: &self.strategy_name,
            result,
            metrics,
            generated_at: self.generated_at,
        };
        fs::write(output_path, render(&ctx)).map_err(|e| TickreplayError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })?;
        info!(path = output_path, "markdown report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::BacktestEngine;
    use crate::domain::error::StrategyError;
    use crate::domain::observation::MarketObservation;
    use crate::domain::portfolio::PortfolioLedger;
    use crate::domain::position::Position;
    use crate::domain::signal::Signal;
    use crate::domain::strategy::Strategy;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct BuyFirstSellLast {
        seen: usize,
        total: usize,
    }

    impl Strategy for BuyFirstSellLast {
        fn name(&self) -> &str {
            "buy_first_sell_last"
        }

        fn on_observation(
            &mut self,
            _observation: &MarketObservation,
            _position: Option<&Position>,
        ) -> Result<Signal, StrategyError> {
            self.seen += 1;
            Ok(match self.seen {
                1 => Signal::buy_qty(10),
                n if n == self.total => Signal::sell_qty(10),
                _ => Signal::Hold,
            })
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 21)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn sample_result() -> BacktestResult {
        let base = NaiveDate::from_ymd_opt(2025, 9, 20)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let prices = [100.0, 102.0, 99.0, 105.0, 110.0];
        let observations: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                MarketObservation::new(base + chrono::Duration::seconds(i as i64), "AAPL", p)
            })
            .collect();
        let mut strategy = BuyFirstSellLast {
            seen: 0,
            total: prices.len(),
        };
        BacktestEngine::default()
            .run(&observations, &mut strategy, PortfolioLedger::new(10_000.0))
            .unwrap()
    }

    #[test]
    fn render_contains_all_sections() {
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.02);
        let report = render(&ReportContext {
            strategy_name: "buy_first_sell_last",
            result: &result,
            metrics: &metrics,
            generated_at: generated_at(),
        });

        for heading in [
            "# Backtest Performance Report",
            "## Executive Summary",
            "## Key Performance Metrics",
            "## Trade Statistics",
            "## Equity Curve",
            "## Returns Analysis",
            "## Final Positions",
            "## Error Analysis",
            "## Recent Orders",
            "## Interpretation",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
        assert!(report.contains("**Generated on:** 2025-09-21 08:00:00"));
        assert!(report.contains("- **Final Equity:** $10100.00"));
        assert!(report.contains("- **Orders:** 2 filled, 0 rejected"));
        assert!(report.contains("_No open positions._"));
    }

    #[test]
    fn adapter_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("performance.md");
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.02);

        MarkdownReportAdapter::new("buy_first_sell_last", generated_at())
            .write(&result, &metrics, path.to_str().unwrap())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Backtest Performance Report"));
    }

    #[test]
    fn adapter_reports_unwritable_path() {
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.02);
        let err = MarkdownReportAdapter::new("x", generated_at())
            .write(&result, &metrics, "/nonexistent/dir/report.md")
            .unwrap_err();
        assert!(matches!(err, TickreplayError::Report { .. }));
    }
}
