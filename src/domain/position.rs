//! Per-symbol position state.

use serde::Serialize;

/// Long-only holding in one symbol.
///
/// `average_price` is the weighted-average cost of the shares still held and
/// is only meaningful while `quantity > 0`; it is reset to zero when the
/// position goes flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub average_price: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            average_price: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.average_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.average_price)
    }

    /// Adds `quantity` shares bought at `price`, re-weighting the cost basis.
    pub(crate) fn add(&mut self, quantity: i64, price: f64) {
        let new_quantity = self.quantity + quantity;
        self.average_price = if new_quantity > 0 {
            (self.cost_basis() + quantity as f64 * price) / new_quantity as f64
        } else {
            0.0
        };
        self.quantity = new_quantity;
    }

    /// Removes `quantity` shares. The cost basis of the remainder is unchanged.
    pub(crate) fn reduce(&mut self, quantity: i64) {
        self.quantity -= quantity;
        if self.quantity == 0 {
            self.average_price = 0.0;
        }
    }
}
