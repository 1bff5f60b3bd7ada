//! Portfolio ledger: cash, positions and valuation.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::execution::{ExecutionConfig, calculate_commission, share_count};
use super::position::Position;

/// One point of the equity curve, recorded after every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub positions_value: f64,
    pub total_equity: f64,
}

/// Why the ledger refused a fill. Rejections are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("insufficient cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("insufficient position: hold {held}, asked to sell {requested}")]
    InsufficientPosition { held: i64, requested: i64 },

    #[error("quantity must be non-zero")]
    InvalidQuantity,

    #[error("fill price must be positive, got {price}")]
    InvalidPrice { price: f64 },
}

/// Outcome of [`PortfolioLedger::apply_fill`].
#[derive(Debug, Clone, PartialEq)]
pub struct FillResult {
    pub accepted: bool,
    pub reason: Option<RejectReason>,
    pub fill_price: f64,
    pub commission: f64,
    /// Set for accepted sells only.
    pub realized_pnl: Option<f64>,
}

impl FillResult {
    pub fn filled(fill_price: f64, commission: f64, realized_pnl: Option<f64>) -> Self {
        Self {
            accepted: true,
            reason: None,
            fill_price,
            commission,
            realized_pnl,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            fill_price: 0.0,
            commission: 0.0,
            realized_pnl: None,
        }
    }
}

/// Long-only cash and position ledger.
///
/// Cash only changes inside [`PortfolioLedger::apply_fill`]. Valuation uses the
/// last price seen for each symbol, either from a fill or from
/// [`PortfolioLedger::mark_to_market`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioLedger {
    cash: f64,
    initial_capital: f64,
    positions: BTreeMap<String, Position>,
    #[serde(skip)]
    last_prices: HashMap<String, f64>,
    realized_pnl: f64,
    total_commission: f64,
    #[serde(skip)]
    execution: ExecutionConfig,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self::with_execution(initial_capital, ExecutionConfig::default())
    }

    pub fn with_execution(initial_capital: f64, execution: ExecutionConfig) -> Self {
        PortfolioLedger {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            last_prices: HashMap::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            execution,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Held quantity, zero when there is no position.
    pub fn quantity(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    /// Open positions ordered by symbol.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    /// Applies a fill of `signed_quantity` shares at `price`.
    ///
    /// Buys need `cash >= quantity * price + commission`; sells need at least
    /// `quantity` shares held. A rejected fill leaves the ledger untouched.
    pub fn apply_fill(&mut self, symbol: &str, signed_quantity: i64, price: f64) -> FillResult {
        if !price.is_finite() || price <= 0.0 {
            return FillResult::rejected(RejectReason::InvalidPrice { price });
        }
        if signed_quantity == 0 {
            return FillResult::rejected(RejectReason::InvalidQuantity);
        }

        let quantity = share_count(signed_quantity);
        let notional = quantity as f64 * price;
        let commission = calculate_commission(notional, &self.execution);

        if signed_quantity > 0 {
            let required = notional + commission;
            if self.cash < required {
                return FillResult::rejected(RejectReason::InsufficientCash {
                    required,
                    available: self.cash,
                });
            }

            self.cash -= required;
            self.positions
                .entry(symbol.to_string())
                .or_insert_with(|| Position::new(symbol))
                .add(quantity, price);
            self.total_commission += commission;
            self.last_prices.insert(symbol.to_string(), price);
            return FillResult::filled(price, commission, None);
        }

        let held = self.quantity(symbol);
        let Some(position) = self.positions.get_mut(symbol).filter(|_| held >= quantity) else {
            return FillResult::rejected(RejectReason::InsufficientPosition {
                held,
                requested: quantity,
            });
        };

        // A flat fee larger than the proceeds must still be covered by cash.
        if self.cash + notional < commission {
            return FillResult::rejected(RejectReason::InsufficientCash {
                required: commission - notional,
                available: self.cash,
            });
        }

        let pnl = quantity as f64 * (price - position.average_price) - commission;
        position.reduce(quantity);
        if position.is_flat() {
            self.positions.remove(symbol);
        }

        self.cash += notional - commission;
        self.realized_pnl += pnl;
        self.total_commission += commission;
        self.last_prices.insert(symbol.to_string(), price);
        FillResult::filled(price, commission, Some(pnl))
    }

    /// Records `price` as the latest for `symbol` and returns total equity.
    pub fn mark_to_market(&mut self, symbol: &str, price: f64) -> f64 {
        self.last_prices.insert(symbol.to_string(), price);
        self.total_equity()
    }

    /// Market value of all open positions at their last known prices.
    pub fn positions_value(&self) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = self
                    .last_prices
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.average_price);
                pos.market_value(price)
            })
            .sum()
    }

    pub fn total_equity(&self) -> f64 {
        self.cash + self.positions_value()
    }

    pub fn snapshot(&self, timestamp: NaiveDateTime) -> EquityPoint {
        let positions_value = self.positions_value();
        EquityPoint {
            timestamp,
            cash: self.cash,
            positions_value,
            total_equity: self.cash + positions_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 20)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_ledger() {
        let ledger = PortfolioLedger::new(10_000.0);
        assert_relative_eq!(ledger.cash(), 10_000.0);
        assert_relative_eq!(ledger.initial_capital(), 10_000.0);
        assert_eq!(ledger.positions().count(), 0);
        assert_relative_eq!(ledger.total_equity(), 10_000.0);
    }

    #[test]
    fn buy_debits_cash_and_opens_position() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        let fill = ledger.apply_fill("AAPL", 10, 100.0);
        assert!(fill.accepted);
        assert!(fill.reason.is_none());
        assert_relative_eq!(ledger.cash(), 9_000.0);
        assert_eq!(ledger.quantity("AAPL"), 10);
        assert_relative_eq!(ledger.position("AAPL").unwrap().average_price, 100.0);
    }

    #[test]
    fn weighted_average_cost_across_buys() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 10, 100.0);
        ledger.apply_fill("AAPL", 10, 120.0);
        let pos = ledger.position("AAPL").unwrap();
        assert_eq!(pos.quantity, 20);
        assert_relative_eq!(pos.average_price, 110.0);
        assert_relative_eq!(ledger.cash(), 7_800.0);
    }

    #[test]
    fn buy_exactly_all_cash_is_accepted() {
        let mut ledger = PortfolioLedger::new(1_000.0);
        let fill = ledger.apply_fill("AAPL", 10, 100.0);
        assert!(fill.accepted);
        assert_eq!(ledger.cash(), 0.0);
    }

    #[test]
    fn buy_without_cash_is_rejected_and_state_unchanged() {
        let mut ledger = PortfolioLedger::new(500.0);
        let before = ledger.clone();
        let fill = ledger.apply_fill("AAPL", 10, 100.0);
        assert!(!fill.accepted);
        assert!(matches!(
            fill.reason,
            Some(RejectReason::InsufficientCash { .. })
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn sell_credits_cash_and_keeps_average_price() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 20, 110.0);
        let fill = ledger.apply_fill("AAPL", -5, 130.0);
        assert!(fill.accepted);
        assert_relative_eq!(fill.realized_pnl.unwrap(), 100.0);
        let pos = ledger.position("AAPL").unwrap();
        assert_eq!(pos.quantity, 15);
        assert_relative_eq!(pos.average_price, 110.0);
        assert_relative_eq!(ledger.cash(), 10_000.0 - 2_200.0 + 650.0);
        assert_relative_eq!(ledger.realized_pnl(), 100.0);
    }

    #[test]
    fn sell_to_flat_removes_position() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 10, 100.0);
        ledger.apply_fill("AAPL", -10, 95.0);
        assert!(ledger.position("AAPL").is_none());
        assert_eq!(ledger.quantity("AAPL"), 0);
        assert_relative_eq!(ledger.cash(), 9_950.0);
        assert_relative_eq!(ledger.realized_pnl(), -50.0);
    }

    #[test]
    fn oversized_sell_is_rejected_idempotently() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 5, 100.0);
        let before = ledger.clone();

        for _ in 0..3 {
            let fill = ledger.apply_fill("AAPL", -10, 100.0);
            assert!(!fill.accepted);
            assert_eq!(
                fill.reason,
                Some(RejectReason::InsufficientPosition {
                    held: 5,
                    requested: 10
                })
            );
            assert_eq!(ledger, before);
        }
    }

    #[test]
    fn naked_short_is_rejected() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        let fill = ledger.apply_fill("AAPL", -1, 100.0);
        assert!(!fill.accepted);
        assert_relative_eq!(ledger.cash(), 10_000.0);
        assert!(ledger.position("AAPL").is_none());
    }

    #[test]
    fn invalid_fill_inputs_are_rejected() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        assert_eq!(
            ledger.apply_fill("AAPL", 0, 100.0).reason,
            Some(RejectReason::InvalidQuantity)
        );
        assert!(matches!(
            ledger.apply_fill("AAPL", 1, 0.0).reason,
            Some(RejectReason::InvalidPrice { .. })
        ));
    }

    #[test]
    fn commission_is_charged_on_both_sides() {
        let execution = ExecutionConfig {
            commission_per_trade: 1.0,
            commission_pct: 0.1,
        };
        let mut ledger = PortfolioLedger::with_execution(10_000.0, execution);

        let buy = ledger.apply_fill("AAPL", 10, 100.0);
        // 1 + 1000 * 0.1%
        assert_relative_eq!(buy.commission, 2.0);
        assert_relative_eq!(ledger.cash(), 10_000.0 - 1_002.0);

        let sell = ledger.apply_fill("AAPL", -10, 110.0);
        assert_relative_eq!(sell.commission, 2.1);
        assert_relative_eq!(sell.realized_pnl.unwrap(), 100.0 - 2.1);
        assert_relative_eq!(ledger.total_commission(), 4.1);
    }

    #[test]
    fn commission_counts_against_available_cash() {
        let execution = ExecutionConfig {
            commission_per_trade: 5.0,
            commission_pct: 0.0,
        };
        let mut ledger = PortfolioLedger::with_execution(1_000.0, execution);
        let fill = ledger.apply_fill("AAPL", 10, 100.0);
        assert!(!fill.accepted);
    }

    #[test]
    fn mark_to_market_revalues_positions() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 10, 100.0);
        let equity = ledger.mark_to_market("AAPL", 105.0);
        assert_relative_eq!(equity, 10_050.0);
        assert_relative_eq!(ledger.positions_value(), 1_050.0);
        assert_eq!(ledger.last_price("AAPL"), Some(105.0));
    }

    #[test]
    fn mark_to_market_other_symbol_leaves_valuation() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 10, 100.0);
        let equity = ledger.mark_to_market("MSFT", 300.0);
        assert_relative_eq!(equity, 10_000.0);
    }

    #[test]
    fn snapshot_matches_equity_identity() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply_fill("AAPL", 10, 100.0);
        ledger.apply_fill("MSFT", 2, 300.0);
        ledger.mark_to_market("AAPL", 90.0);
        let point = ledger.snapshot(ts());
        assert_relative_eq!(point.cash, 8_400.0);
        assert_relative_eq!(point.positions_value, 900.0 + 600.0);
        assert_relative_eq!(point.total_equity, point.cash + point.positions_value);
    }

    #[test]
    fn min_quantity_is_rejected_not_a_panic() {
        let mut ledger = PortfolioLedger::new(1_000.0);
        ledger.apply_fill("AAPL", 2, 100.0);

        let sell = ledger.apply_fill("AAPL", i64::MIN, 100.0);
        assert!(!sell.accepted);
        assert!(matches!(
            sell.reason,
            Some(RejectReason::InsufficientPosition { held: 2, .. })
        ));
        assert_eq!(ledger.quantity("AAPL"), 2);
        assert_eq!(ledger.cash(), 800.0);
    }

    #[test]
    fn sell_fee_above_proceeds_needs_cash() {
        let config = ExecutionConfig {
            commission_per_trade: 5.0,
            commission_pct: 0.0,
        };
        let mut ledger = PortfolioLedger::with_execution(7.0, config);
        assert!(ledger.apply_fill("PENNY", 1, 2.0).accepted);
        assert_relative_eq!(ledger.cash(), 0.0);

        let fill = ledger.apply_fill("PENNY", -1, 2.0);
        assert!(!fill.accepted);
        assert!(matches!(
            fill.reason,
            Some(RejectReason::InsufficientCash { .. })
        ));
        assert_eq!(ledger.quantity("PENNY"), 1);
    }
}
