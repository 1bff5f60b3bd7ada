//! Momentum over a fixed lookback.
//!
//! change = (P[now] - P[now - lookback]) / P[now - lookback]
//! BUY when change >= threshold, SELL when change <= -threshold and something
//! is held. `threshold` is a fraction (0.01 = 1%).

use crate::domain::error::StrategyError;
use crate::domain::observation::MarketObservation;
use crate::domain::position::Position;
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;

use super::PriceWindow;

#[derive(Debug, Clone)]
pub struct Momentum {
    symbol: String,
    threshold: f64,
    trade_qty: Option<i64>,
    window: PriceWindow,
}

impl Momentum {
    pub fn new(
        symbol: &str,
        lookback: usize,
        threshold: f64,
        trade_qty: Option<i64>,
    ) -> Result<Self, StrategyError> {
        if lookback < 1 {
            return Err(StrategyError::new("lookback must be at least 1"));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(StrategyError::new(format!(
                "threshold must be non-negative, got {threshold}"
            )));
        }
        if let Some(qty) = trade_qty {
            if qty < 1 {
                return Err(StrategyError::new(format!(
                    "trade_qty must be at least 1, got {qty}"
                )));
            }
        }
        Ok(Self {
            symbol: symbol.to_string(),
            threshold,
            trade_qty,
            window: PriceWindow::new(lookback + 1),
        })
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        position: Option<&Position>,
    ) -> Result<Signal, StrategyError> {
        if observation.symbol != self.symbol {
            return Ok(Signal::Hold);
        }

        self.window.push(observation.price);
        if !self.window.is_full() {
            return Ok(Signal::Hold);
        }

        let (Some(past), Some(now)) = (self.window.oldest(), self.window.latest()) else {
            return Ok(Signal::Hold);
        };
        if past <= 0.0 {
            return Ok(Signal::Hold);
        }

        let change = (now - past) / past;
        if change >= self.threshold {
            return Ok(Signal::Buy {
                quantity: self.trade_qty,
            });
        }
        if change <= -self.threshold {
            let held = position.map_or(0, |p| p.quantity);
            if held > 0 {
                return Ok(Signal::Sell {
                    quantity: self.trade_qty.map(|q| q.min(held)),
                });
            }
        }
        Ok(Signal::Hold)
    }
}
