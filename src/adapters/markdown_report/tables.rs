//! Markdown table formatting for reports.
//!
//! Provides functions to generate Markdown for:
//! - Key metrics and trade statistics tables
//! - Final positions table
//! - Error summary by time bucket
//! - Recent trade log

use crate::domain::error_log::ErrorLog;
use crate::domain::metrics::Metrics;
use crate::domain::order::{Order, OrderSide, OrderStatus};
use crate::domain::portfolio::PortfolioLedger;

/// Number of most recent orders listed in the trade log table.
pub const RECENT_TRADES: usize = 20;

pub fn format_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

pub fn format_money(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", value.abs())
    } else {
        format!("${:.2}", value)
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_infinite() && value > 0.0 {
        "∞".to_string()
    } else if value.is_finite() {
        format!("{:.3}", value)
    } else {
        "n/a".to_string()
    }
}

fn two_column_table(header: (&str, &str), rows: &[(&str, String)]) -> String {
    let mut output = format!("| {} | {} |\n|---|---|\n", header.0, header.1);
    for (label, value) in rows {
        output.push_str(&format!("| **{}** | {} |\n", label, value));
    }
    output.push('\n');
    output
}

pub fn render_metrics_table(metrics: &Metrics) -> String {
    two_column_table(
        ("Metric", "Value"),
        &[
            ("Total Return", format_pct(metrics.total_return)),
            ("Annualized Return", format_pct(metrics.annualized_return)),
            ("Sharpe Ratio", format_ratio(metrics.sharpe_ratio)),
            ("Sortino Ratio", format_ratio(metrics.sortino_ratio)),
            ("Maximum Drawdown", format_pct(metrics.max_drawdown)),
            (
                "Max Drawdown Duration",
                format!("{} ticks", metrics.max_drawdown_duration),
            ),
            ("Volatility (Annualized)", format_pct(metrics.volatility)),
            ("Realized P&L", format_money(metrics.realized_pnl)),
            ("Total Commission", format_money(metrics.total_commission)),
        ],
    )
}

pub fn render_trade_stats_table(metrics: &Metrics) -> String {
    two_column_table(
        ("Statistic", "Value"),
        &[
            ("Orders Filled", metrics.orders_filled.to_string()),
            ("Orders Rejected", metrics.orders_rejected.to_string()),
            ("Round Trips", metrics.total_trades.to_string()),
            ("Winning Trades", metrics.trades_won.to_string()),
            ("Losing Trades", metrics.trades_lost.to_string()),
            ("Breakeven Trades", metrics.trades_breakeven.to_string()),
            ("Win Rate", format_pct(metrics.win_rate)),
            ("Profit Factor", format_ratio(metrics.profit_factor)),
            ("Average Win", format_money(metrics.avg_win)),
            ("Average Loss", format_money(metrics.avg_loss)),
            ("Largest Win", format_money(metrics.largest_win)),
            ("Largest Loss", format_money(metrics.largest_loss)),
        ],
    )
}

pub fn render_positions_table(ledger: &PortfolioLedger) -> String {
    let mut positions = ledger.positions().peekable();
    if positions.peek().is_none() {
        return "_No open positions._\n\n".to_string();
    }

    let mut output = String::from(
        "| Symbol | Quantity | Avg Price | Last Price | Market Value | Unrealized P&L |\n\
         |---|---:|---:|---:|---:|---:|\n",
    );
    for position in positions {
        let last = ledger
            .last_price(&position.symbol)
            .unwrap_or(position.average_price);
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            position.symbol,
            position.quantity,
            format_money(position.average_price),
            format_money(last),
            format_money(position.market_value(last)),
            format_money(position.unrealized_pnl(last)),
        ));
    }
    output.push_str(&format!("\n**Cash:** {}\n\n", format_money(ledger.cash())));
    output
}

pub fn render_error_summary(errors: &ErrorLog) -> String {
    if errors.is_empty() {
        return "_No errors recorded._\n\n".to_string();
    }

    let mut output = format!("**Total Errors:** {}\n\n", errors.total());
    output.push_str("| Bucket | Errors |\n|---|---:|\n");
    for record in errors.records() {
        output.push_str(&format!("| {} | {} |\n", record.bucket, record.count));
    }
    output.push('\n');

    output.push_str("| Kind | Count |\n|---|---:|\n");
    for (kind, count) in errors.kinds() {
        output.push_str(&format!("| {} | {} |\n", kind, count));
    }
    output.push('\n');
    output
}

fn side_label(order: &Order) -> &'static str {
    match order.side() {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

fn status_label(order: &Order) -> String {
    match (&order.status, &order.reject_reason) {
        (OrderStatus::Rejected, Some(reason)) => format!("REJECTED ({reason})"),
        (OrderStatus::Rejected, None) => "REJECTED".to_string(),
        (OrderStatus::Filled, _) => "FILLED".to_string(),
        (OrderStatus::Pending, _) => "PENDING".to_string(),
    }
}

/// The last `limit` orders, oldest first.
pub fn render_trade_log(orders: &[Order], limit: usize) -> String {
    if orders.is_empty() {
        return "_No orders were generated._\n\n".to_string();
    }

    let skip = orders.len().saturating_sub(limit);
    let mut output = String::new();
    if skip > 0 {
        output.push_str(&format!(
            "_Showing the last {} of {} orders._\n\n",
            orders.len() - skip,
            orders.len()
        ));
    }
    output.push_str(
        "| # | Time | Symbol | Side | Qty | Price | Commission | P&L | Status |\n\
         |---:|---|---|---|---:|---:|---:|---:|---|\n",
    );
    for order in &orders[skip..] {
        let price = order.fill_price.unwrap_or(order.requested_price);
        let pnl = order
            .realized_pnl
            .map(format_money)
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            order.id,
            order.timestamp.format("%Y-%m-%d %H:%M:%S"),
            order.symbol,
            side_label(order),
            order.abs_quantity(),
            format_money(price),
            format_money(order.commission),
            pnl,
            status_label(order),
        ));
    }
    output.push('\n');
    output
}
