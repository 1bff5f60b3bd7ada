//! Performance metrics and statistics.
//!
//! Periodic returns are taken tick to tick along the equity curve and
//! annualized assuming 252 periods per year.

use serde::Serialize;

use super::backtest::BacktestResult;
use super::order::OrderStatus;
use super::portfolio::EquityPoint;

const PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub orders_filled: usize,
    pub orders_rejected: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub realized_pnl: f64,
    pub total_commission: f64,
    pub error_count: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let equity_curve = &result.equity_curve;
        let initial_capital = result.ledger.initial_capital();
        let final_equity = result.final_equity();

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity_curve.len() as f64 / PERIODS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let period_rf = risk_free_rate / PERIODS_PER_YEAR;
        let risk = compute_risk_adjusted(equity_curve, period_rf);

        let mut orders_filled = 0usize;
        let mut orders_rejected = 0usize;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for order in &result.trade_log {
            match order.status {
                OrderStatus::Filled => orders_filled += 1,
                OrderStatus::Rejected => orders_rejected += 1,
                OrderStatus::Pending => {}
            }

            // A round trip is any filled sell; its P&L is measured against the
            // average cost at the time of the sale.
            let Some(pnl) = order.realized_pnl.filter(|_| order.is_filled()) else {
                continue;
            };
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
        }

        let total_trades = trades_won + trades_lost + trades_breakeven;
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        Metrics {
            initial_capital,
            final_equity,
            total_return,
            annualized_return,
            volatility: risk.volatility,
            sharpe_ratio: risk.sharpe,
            sortino_ratio: risk.sortino,
            max_drawdown,
            max_drawdown_duration,
            orders_filled,
            orders_rejected,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            realized_pnl: result.ledger.realized_pnl(),
            total_commission: result.ledger.total_commission(),
            error_count: result.error_log.total(),
        }
    }
}

/// Tick-to-tick simple returns of total equity.
pub fn periodic_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].total_equity;
            let curr = w[1].total_equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Max peak-to-trough decline (fraction) and the longest run of ticks spent
/// below a prior peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.total_equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.total_equity > peak {
            peak = point.total_equity;
            current_dd_duration = 0;
        } else if peak > 0.0 && point.total_equity < peak {
            let dd = (peak - point.total_equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

struct RiskAdjusted {
    volatility: f64,
    sharpe: f64,
    sortino: f64,
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], period_rf: f64) -> RiskAdjusted {
    let returns = periodic_returns(equity_curve);
    if returns.is_empty() {
        return RiskAdjusted {
            volatility: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
        };
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - period_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sum: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sum / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    RiskAdjusted {
        volatility: stddev * PERIODS_PER_YEAR.sqrt(),
        sharpe,
        sortino,
    }
}
