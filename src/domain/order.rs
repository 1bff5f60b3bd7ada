//! Orders and their resolution against the ledger.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::execution::share_count;
use super::portfolio::{FillResult, RejectReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
}

/// An intended trade. Quantity is signed: positive buys, negative sells.
///
/// Orders are created `Pending` and resolved by value with [`Order::resolve`];
/// the engine never holds a pending order across ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: u64,
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub quantity: i64,
    pub requested_price: f64,
    pub status: OrderStatus,
    pub fill_price: Option<f64>,
    pub commission: f64,
    pub realized_pnl: Option<f64>,
    pub reject_reason: Option<RejectReason>,
}

impl Order {
    pub fn pending(
        id: u64,
        timestamp: NaiveDateTime,
        symbol: impl Into<String>,
        quantity: i64,
        requested_price: f64,
    ) -> Self {
        Self {
            id,
            timestamp,
            symbol: symbol.into(),
            quantity,
            requested_price,
            status: OrderStatus::Pending,
            fill_price: None,
            commission: 0.0,
            realized_pnl: None,
            reject_reason: None,
        }
    }

    pub fn side(&self) -> OrderSide {
        if self.quantity >= 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    /// Unsigned share count.
    pub fn abs_quantity(&self) -> i64 {
        share_count(self.quantity)
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Consumes the pending order and returns it resolved by `fill`.
    pub fn resolve(self, fill: &FillResult) -> Self {
        if fill.accepted {
            Order {
                status: OrderStatus::Filled,
                fill_price: Some(fill.fill_price),
                commission: fill.commission,
                realized_pnl: fill.realized_pnl,
                reject_reason: None,
                ..self
            }
        } else {
            Order {
                status: OrderStatus::Rejected,
                fill_price: None,
                commission: 0.0,
                realized_pnl: None,
                reject_reason: fill.reason.clone(),
                ..self
            }
        }
    }

    /// Net cash effect of a filled order: negative for buys.
    pub fn cash_flow(&self) -> f64 {
        match (self.status, self.fill_price) {
            (OrderStatus::Filled, Some(price)) => {
                -(self.quantity as f64 * price) - self.commission
            }
            _ => 0.0,
        }
    }
}
