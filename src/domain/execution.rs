//! Execution parameters: commission model and order sizing.
//!
//! Fills always happen at the observed price for the full quantity. What
//! varies is how much is traded and what it costs.

use serde::Serialize;

use super::portfolio::PortfolioLedger;
use super::signal::Signal;

/// Commission settings applied by the ledger on every fill.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionConfig {
    pub commission_per_trade: f64,
    pub commission_pct: f64,
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Absolute share count, saturating at `i64::MAX` for `i64::MIN`.
pub(crate) fn share_count(signed_quantity: i64) -> i64 {
    i64::try_from(signed_quantity.unsigned_abs()).unwrap_or(i64::MAX)
}

/// How a BUY or SELL signal without an explicit quantity is turned into shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", content = "lot", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Trade a fixed number of shares per signal.
    FixedLot(i64),
    /// Buy as many whole shares as cash allows; sell the whole position.
    AllInAllOut,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::FixedLot(1)
    }
}

/// Signed order quantity for `signal` at `price`; zero means nothing to trade.
///
/// An explicit quantity on the signal wins over the policy.
pub fn size_order(
    signal: &Signal,
    symbol: &str,
    price: f64,
    policy: SizingPolicy,
    ledger: &PortfolioLedger,
) -> i64 {
    match *signal {
        Signal::Hold => 0,
        Signal::Buy {
            quantity: Some(qty),
        } => share_count(qty),
        Signal::Sell {
            quantity: Some(qty),
        } => -share_count(qty),
        Signal::Buy { quantity: None } => match policy {
            SizingPolicy::FixedLot(lot) => lot,
            SizingPolicy::AllInAllOut => affordable_quantity(ledger, price),
        },
        Signal::Sell { quantity: None } => match policy {
            SizingPolicy::FixedLot(lot) => -lot,
            SizingPolicy::AllInAllOut => -ledger.quantity(symbol),
        },
    }
}

/// Largest whole-share buy that cash covers, commission included.
///
/// Solves `q * price * (1 + pct / 100) + flat <= cash` directly, then steps
/// down to absorb float rounding.
fn affordable_quantity(ledger: &PortfolioLedger, price: f64) -> i64 {
    if !price.is_finite() || price <= 0.0 {
        return 0;
    }
    let config = ledger.execution();
    let cash = ledger.cash();
    let spendable = cash - config.commission_per_trade;
    if spendable <= 0.0 {
        return 0;
    }

    let unit_cost = price * (1.0 + config.commission_pct / 100.0);
    // `as` saturates, so an absurd ratio caps at i64::MAX.
    let mut quantity = (spendable / unit_cost).floor() as i64;
    while quantity > 0 {
        let notional = quantity as f64 * price;
        if notional + calculate_commission(notional, config) <= cash {
            break;
        }
        quantity -= 1;
    }
    quantity.max(0)
}
